//! Data source scrapers for environmental readings and news feeds.
//!
//! # Supported Sources
//!
//! | Source | Module | Method | Fallback |
//! |--------|--------|--------|----------|
//! | Jalisco air-quality network | [`air_quality`] | HTML text matching | Simulated readings for all 13 stations |
//! | CEA Jalisco Chapala level | [`chapala`] | Regex on page body | Fixed 94.50 msnm |
//! | Google News search | [`google_news`] | RSS 2.0 via `rss` | Empty list |
//!
//! Scrapers never abort the run: failures are logged and replaced by the
//! fallback listed above (when the caller allows it).

pub mod air_quality;
pub mod chapala;
pub mod google_news;
