//! News ingestion for the two domains: ZMG environment and Chivas.
//!
//! Both domains follow the same steps:
//!
//! 1. **Cache**: reuse today's snapshot when one exists (unless refreshing)
//! 2. **Fetch**: read the Google News search feed for the topic query
//! 3. **Extract**: clean each entry into a [`NewsItem`]
//! 4. **Filter**: optionally have Gemini rewrite the description as a neutral summary
//! 5. **Store**: write the non-empty result back as today's snapshot
//!
//! They differ only in query, prompt, model chain and defaults, captured
//! by [`NewsTopic`].

use crate::api::Summarizer;
use crate::cache::DailyCache;
use crate::config::{Config, TopicSettings};
use crate::fetch::Fetcher;
use crate::models::NewsItem;
use crate::scrapers::google_news::{self, FeedEntry};
use crate::utils::strip_html;
use futures::stream::{self, StreamExt};
use itertools::Itertools;
use std::fmt;
use tracing::{debug, info, instrument, warn};

/// Characters of description kept when no model summary is available.
const FALLBACK_SUMMARY_CHARS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NewsTopic {
    /// Environmental news for the Guadalajara metropolitan area.
    Environment,
    /// Chivas de Guadalajara.
    Sports,
}

impl fmt::Display for NewsTopic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NewsTopic::Environment => write!(f, "environment"),
            NewsTopic::Sports => write!(f, "sports"),
        }
    }
}

impl NewsTopic {
    pub fn settings<'a>(&self, config: &'a Config) -> &'a TopicSettings {
        match self {
            NewsTopic::Environment => &config.environment_news,
            NewsTopic::Sports => &config.sports_news,
        }
    }

    /// Outlet name used when an entry has no `<source>`.
    pub fn default_source(&self) -> &'static str {
        match self {
            NewsTopic::Environment => "Google News",
            NewsTopic::Sports => "Fuente desconocida",
        }
    }

    pub fn prompt(&self, title: &str, description: &str) -> String {
        match self {
            NewsTopic::Environment => format!(
                "Actúa como analista ambiental. Resume esta noticia de GDL en 1 frase clara y un parrafo conciso para analizar el contenido:\nTítulo: {title}\nTexto: {description}"
            ),
            NewsTopic::Sports => format!(
                "Actúa como un analista deportivo objetivo.\nAnaliza esta noticia sobre Chivas:\nTítulo: {title}\nDescripción: {description}\n\nTu tarea:\n1. Elimina el clickbait y el sensacionalismo.\n2. Resume la noticia en una o dos frases concisas, con la información más importante."
            ),
        }
    }
}

/// Options for one [`get_news`] call.
#[derive(Debug, Clone, Copy)]
pub struct NewsRequest {
    pub max_items: usize,
    pub use_ai: bool,
    /// Ignore today's snapshot and hit the network.
    pub refresh: bool,
}

/// Shared collaborators of the news pipeline.
#[derive(Debug, Clone, Copy)]
pub struct NewsSources<'a> {
    pub fetcher: &'a Fetcher,
    pub summarizer: &'a Summarizer,
    pub cache: &'a DailyCache,
    pub config: &'a Config,
}

/// Summary used when the model is unavailable or failed.
pub fn fallback_summary(description: &str) -> String {
    if description.is_empty() {
        return "Sin descripción".to_string();
    }
    let head: String = description.chars().take(FALLBACK_SUMMARY_CHARS).collect();
    format!("{head}...")
}

/// Turn raw feed entries into unsummarized news items.
///
/// Keeps the first `max_items` entries, drops repeated links and strips
/// HTML from descriptions. `ai_summary` starts out as the description.
pub fn extract_items(topic: NewsTopic, entries: Vec<FeedEntry>, max_items: usize) -> Vec<NewsItem> {
    entries
        .into_iter()
        .take(max_items)
        .map(|entry| {
            let description = strip_html(entry.description.as_deref().unwrap_or_default());
            NewsItem {
                title: entry.title.unwrap_or_else(|| "Sin título".to_string()),
                ai_summary: description.clone(),
                description,
                link: entry.link.unwrap_or_default(),
                source: entry.source.unwrap_or_else(|| topic.default_source().to_string()),
                published: entry.pub_date,
                processed: false,
                error: None,
            }
        })
        .unique_by(|item| if item.link.is_empty() { item.title.clone() } else { item.link.clone() })
        .collect()
}

/// Fill `ai_summary` for one item.
///
/// With a working summarizer the model output is used and `processed` is
/// set. Otherwise the truncated description stands in and `error` records
/// why, when there was a failure.
pub async fn summarize_item(topic: NewsTopic, summarizer: &Summarizer, models: &[String], mut item: NewsItem) -> NewsItem {
    if !summarizer.is_enabled() {
        item.ai_summary = fallback_summary(&item.description);
        item.processed = false;
        return item;
    }

    match summarizer.summarize(&topic.prompt(&item.title, &item.description), models).await {
        Ok(summary) => {
            item.ai_summary = summary;
            item.processed = true;
            item.error = None;
        }
        Err(e) => {
            warn!(%topic, title = %item.title, error = %e, "Summary failed; using description");
            item.ai_summary = fallback_summary(&item.description);
            item.processed = false;
            item.error = Some(e.to_string());
        }
    }
    item
}

/// Give every item without a model summary the truncated description.
fn with_fallback_summaries(items: Vec<NewsItem>) -> Vec<NewsItem> {
    items
        .into_iter()
        .map(|mut item| {
            if !item.processed {
                item.ai_summary = fallback_summary(&item.description);
            }
            item
        })
        .collect()
}

async fn summarize_all(topic: NewsTopic, summarizer: &Summarizer, models: &[String], items: Vec<NewsItem>) -> Vec<NewsItem> {
    stream::iter(items)
        .then(|item| summarize_item(topic, summarizer, models, item))
        .collect()
        .await
}

/// Get today's news for `topic`, from the snapshot or the network.
///
/// Never fails: network and parse errors are logged and yield an empty
/// list, which is not cached.
#[instrument(level = "info", skip(sources), fields(%topic))]
pub async fn get_news(sources: NewsSources<'_>, topic: NewsTopic, request: NewsRequest) -> Vec<NewsItem> {
    let settings = topic.settings(sources.config);
    let summarize = request.use_ai && sources.summarizer.is_enabled();
    if request.use_ai && !summarize {
        warn!(%topic, "AI summaries requested but no API key is configured");
    }

    if !request.refresh {
        if let Some(mut cached) = sources.cache.load::<Vec<NewsItem>>(&settings.cache_file).await {
            if !cached.is_empty() {
                cached.truncate(request.max_items);
                if summarize && cached.iter().any(|item| !item.processed) {
                    info!(%topic, "Summarizing cached items that were stored without summaries");
                    let summarizer = sources.summarizer;
                    let models = settings.models.as_slice();
                    cached = stream::iter(cached)
                        .then(move |item| async move {
                            if item.processed {
                                item
                            } else {
                                summarize_item(topic, summarizer, models, item).await
                            }
                        })
                        .collect()
                        .await;
                    store(sources.cache, topic, &settings.cache_file, &cached).await;
                } else if request.use_ai && !summarize {
                    cached = with_fallback_summaries(cached);
                }
                return cached;
            }
            debug!(%topic, "Cached list is empty; fetching");
        }
    }

    let url = match google_news::search_url(&sources.config.sources.google_news_rss_url, &settings.query) {
        Ok(url) => url,
        Err(e) => {
            warn!(%topic, error = %e, "Invalid Google News URL");
            return Vec::new();
        }
    };

    let entries = match google_news::fetch_feed(sources.fetcher, &url).await {
        Ok(entries) => entries,
        Err(e) => {
            warn!(%topic, %url, error = %e, "Failed downloading news feed");
            return Vec::new();
        }
    };

    let items = extract_items(topic, entries, request.max_items);
    let items = if summarize {
        summarize_all(topic, sources.summarizer, &settings.models, items).await
    } else if request.use_ai {
        with_fallback_summaries(items)
    } else {
        items
    };

    if items.is_empty() {
        warn!(%topic, "Feed returned no items; nothing cached");
    } else {
        store(sources.cache, topic, &settings.cache_file, &items).await;
    }

    info!(%topic, count = items.len(), "News ready");
    items
}

async fn store(cache: &DailyCache, topic: NewsTopic, filename: &str, items: &[NewsItem]) {
    if let Err(e) = cache.save(filename, items).await {
        warn!(%topic, file = filename, error = %e, "Failed saving cache snapshot");
    }
}
