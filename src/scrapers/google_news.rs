//! Google News RSS search feeds.
//!
//! Both news domains read the same kind of feed: an RSS 2.0 search result
//! from `news.google.com/rss/search`, localized to Mexican Spanish. Each
//! `<item>` carries a title, a Google redirect link, an HTML description
//! fragment, a publication date and a `<source>` element naming the outlet.

use crate::fetch::Fetcher;
use rss::Channel;
use std::error::Error;
use tracing::{debug, info, instrument};
use url::Url;

/// One `<item>` of a feed, before any cleanup.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct FeedEntry {
    pub title: Option<String>,
    pub link: Option<String>,
    pub description: Option<String>,
    pub pub_date: Option<String>,
    /// Text of `<source url="...">Outlet</source>`.
    pub source: Option<String>,
}

/// Build a Mexican-Spanish Google News search URL for `query`.
pub fn search_url(base: &str, query: &str) -> Result<String, Box<dyn Error>> {
    let url = Url::parse_with_params(base, &[("q", query), ("hl", "es"), ("gl", "MX"), ("ceid", "MX:es")])?;
    Ok(url.to_string())
}

fn non_empty(text: Option<&str>) -> Option<String> {
    text.map(str::trim).filter(|t| !t.is_empty()).map(str::to_string)
}

/// Parse an RSS 2.0 document into its items.
///
/// Entities and CDATA are resolved by the `rss` reader. Blank fields
/// become `None`. Channel-level title and link are ignored.
pub fn parse_feed(xml: &[u8]) -> Result<Vec<FeedEntry>, Box<dyn Error>> {
    let channel = Channel::read_from(xml)?;
    let entries = channel
        .items()
        .iter()
        .map(|item| FeedEntry {
            title: non_empty(item.title()),
            link: non_empty(item.link()),
            description: non_empty(item.description()),
            pub_date: non_empty(item.pub_date()),
            source: non_empty(item.source().and_then(|s| s.title())),
        })
        .collect();
    Ok(entries)
}

/// Download and parse a feed, posing as a desktop browser.
#[instrument(level = "info", skip(fetcher))]
pub async fn fetch_feed(fetcher: &Fetcher, url: &str) -> Result<Vec<FeedEntry>, Box<dyn Error>> {
    let body = fetcher.get_as_browser(url).await?;
    let entries = parse_feed(&body)?;
    info!(count = entries.len(), "Parsed feed entries");
    debug!(titles = ?entries.iter().map(|e| e.title.as_deref().unwrap_or_default()).collect::<Vec<_>>(), "Feed titles");
    Ok(entries)
}
