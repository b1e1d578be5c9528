//! Lake Chapala level scraper (CEA Jalisco "cota" page).
//!
//! The page states the current level as a plain `dd.dd` figure in metres
//! above sea level; the first such number in the body is taken.

use crate::config::Config;
use crate::fetch::Fetcher;
use crate::models::{ChapalaLevel, DataOrigin};
use crate::utils::clock_time;
use chrono::Local;
use once_cell::sync::Lazy;
use regex::Regex;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Level reported when the page cannot be read.
pub const MOCK_LEVEL_MSNM: f64 = 94.50;

static LEVEL: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d{2}\.\d{2})").expect("valid level regex"));

pub fn extract_level(body: &str) -> Option<f64> {
    LEVEL.captures(body)?.get(1)?.as_str().parse().ok()
}

fn reading(level_msnm: f64, source: DataOrigin) -> ChapalaLevel {
    ChapalaLevel {
        level_msnm,
        unit: "msnm".to_string(),
        last_update: clock_time(&Local::now()),
        source,
    }
}

/// Fetch the current level, or the mock level when that is allowed.
#[instrument(level = "info", skip_all)]
pub async fn get_level(fetcher: &Fetcher, config: &Config, use_mock_on_error: bool) -> Option<ChapalaLevel> {
    let url = &config.sources.chapala_level_url;
    let timeout = Duration::from_secs(config.http.chapala_timeout_secs);

    let level = match fetcher.get(url, Some(timeout)).await {
        Ok(response) if response.status().is_success() => match response.text().await {
            Ok(body) => extract_level(&body),
            Err(e) => {
                warn!(%url, error = %e, "Failed reading Chapala page");
                None
            }
        },
        Ok(response) => {
            warn!(%url, status = %response.status(), "Chapala page returned an error status");
            None
        }
        Err(e) => {
            warn!(%url, error = %e, "Chapala scrape failed");
            None
        }
    };

    match level {
        Some(level) => {
            info!(level_msnm = level, "Scraped Chapala level");
            Some(reading(level, DataOrigin::Real))
        }
        None if use_mock_on_error => {
            warn!(level_msnm = MOCK_LEVEL_MSNM, "Using simulated Chapala level");
            Some(reading(MOCK_LEVEL_MSNM, DataOrigin::Mock))
        }
        None => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_extract_level() {
        assert_eq!(extract_level("<td>Cota actual:</td><td>95.12 msnm</td>"), Some(95.12));
        assert_eq!(extract_level("Nivel 9.5 y 1524.33"), Some(24.33));
        assert_eq!(extract_level("sin datos"), None);
    }

    #[tokio::test]
    async fn test_get_level_real_and_fallback() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<p>Cota: 93.87</p>"))
            .mount(&server)
            .await;

        let mut config = Config::defaults();
        config.sources.chapala_level_url = server.uri();
        let fetcher = Fetcher::new(&config.http).unwrap();

        let level = get_level(&fetcher, &config, true).await.unwrap();
        assert_eq!(level.level_msnm, 93.87);
        assert_eq!(level.source, DataOrigin::Real);
        assert_eq!(level.unit, "msnm");
    }

    #[tokio::test]
    async fn test_get_level_without_number() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("mantenimiento"))
            .mount(&server)
            .await;

        let mut config = Config::defaults();
        config.sources.chapala_level_url = server.uri();
        let fetcher = Fetcher::new(&config.http).unwrap();

        let mock = get_level(&fetcher, &config, true).await.unwrap();
        assert_eq!(mock.level_msnm, MOCK_LEVEL_MSNM);
        assert_eq!(mock.source, DataOrigin::Mock);
        assert!(get_level(&fetcher, &config, false).await.is_none());
    }
}
