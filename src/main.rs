//! # GDL Insight
//!
//! A daily environmental and sports briefing for the Guadalajara
//! metropolitan area (ZMG). Each run gathers air-quality readings, the Lake
//! Chapala level and two Google News topics, optionally has Gemini summarize
//! the news, and writes a JSON digest plus an HTML briefing.
//!
//! ## Features
//!
//! - Scrapes IMECA readings for 13 ZMG stations, with simulated readings
//!   when the network site is unreadable
//! - Reads the Lake Chapala level from the CEA Jalisco page
//! - Pulls environment and Chivas news from Google News RSS
//! - Summarizes news through the Gemini REST API with retries and a model fallback chain
//! - Caches each news topic once per day
//!
//! ## Usage
//!
//! ```sh
//! gdl_insight -o ./output
//! ```
//!
//! ## Architecture
//!
//! The application runs a short pipeline:
//! 1. **Readings**: Air quality for every station, then the Chapala level
//! 2. **News**: Environment and Chivas topics (cache first, then feed and summaries)
//! 3. **Output**: `digest.json` for the dashboard and `briefing.html` for the mailer

use chrono::Local;
use clap::Parser;
use std::error::Error;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod cache;
mod cli;
mod config;
mod fetch;
mod models;
mod news;
mod outputs;
mod scrapers;
mod utils;

use api::Summarizer;
use cache::DailyCache;
use cli::Cli;
use fetch::Fetcher;
use models::{Digest, worst_station};
use news::{NewsRequest, NewsSources, NewsTopic};
use outputs::{briefing, json};
use utils::{clock_time, ensure_writable_dir, local_date};

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("gdl_insight starting up");

    match dotenvy::dotenv() {
        Ok(path) => debug!(path = %path.display(), "Loaded .env"),
        Err(e) if e.not_found() => debug!("No .env file"),
        Err(e) => warn!(error = %e, "Ignoring unreadable .env"),
    }

    let args = Cli::parse();
    debug!(?args.output_dir, ?args.cache_dir, ?args.config, "Parsed CLI arguments");

    // ---- Config ----
    let mut config = config::load_config(args.config.as_deref())?;
    if let Some(max_items) = args.max_items {
        config.environment_news.max_items = max_items;
        config.sports_news.max_items = max_items;
    }
    config.gemini.api_key = if args.no_ai {
        None
    } else {
        config::resolve_api_key(args.gemini_api_key.clone())
    };

    // Early check: both directories must be writable
    for dir in [&args.output_dir, &args.cache_dir] {
        if let Err(e) = ensure_writable_dir(dir).await {
            error!(path = %dir, error = %e, "Directory is not writable (fix perms or choose a different path)");
            return Err(e);
        }
    }

    let fetcher = Fetcher::new(&config.http)?;
    let summarizer = Summarizer::new(fetcher.client().clone(), config.gemini.clone());
    let cache = DailyCache::new(&args.cache_dir, args.max_age_hours);
    info!(
        cache_dir = %cache.dir().display(),
        summaries = summarizer.is_enabled(),
        mock_fallback = !args.no_mock,
        "Pipeline ready"
    );

    // ---- Readings ----
    let use_mock = !args.no_mock;
    let stations = scrapers::air_quality::scrape_all_stations(&fetcher, &config, use_mock).await;
    let worst = worst_station(&stations).cloned();
    match &worst {
        Some(w) => info!(station = %w.station, imeca = w.imeca, status = w.status.label(), "Worst air-quality station"),
        None => warn!("No air-quality readings available"),
    }

    let chapala = scrapers::chapala::get_level(&fetcher, &config, use_mock).await;

    // ---- News ----
    let sources = NewsSources {
        fetcher: &fetcher,
        summarizer: &summarizer,
        cache: &cache,
        config: &config,
    };
    let request = |topic: NewsTopic| NewsRequest {
        max_items: topic.settings(&config).max_items,
        use_ai: !args.no_ai,
        refresh: args.refresh,
    };
    let environment_news = news::get_news(sources, NewsTopic::Environment, request(NewsTopic::Environment)).await;
    let sports_news = news::get_news(sources, NewsTopic::Sports, request(NewsTopic::Sports)).await;

    // ---- Digest ----
    let now = Local::now();
    let digest = Digest {
        local_date: local_date(&now),
        local_time: clock_time(&now),
        stations,
        worst_station: worst,
        chapala,
        environment_news,
        sports_news,
    };
    info!(
        local_date = %digest.local_date,
        local_time = %digest.local_time,
        stations = digest.stations.len(),
        environment_news = digest.environment_news.len(),
        sports_news = digest.sports_news.len(),
        "Digest assembled"
    );

    if let Err(e) = json::write_digest(&digest, &args.output_dir).await {
        error!(error = %e, "Failed to write digest JSON");
    }

    // ---- Briefing ----
    let briefing = briefing::compose(&digest, &config.briefing);
    if let Err(e) = briefing::write_briefing(&briefing, &args.output_dir, &digest.local_date).await {
        error!(error = %e, "Failed to write briefing");
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    Ok(())
}
