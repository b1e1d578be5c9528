//! ZMG air-quality scraper.
//!
//! The state monitoring site (`aire.jalisco.gob.mx`) renders station values
//! with client-side widgets whose markup changes often, so the page is
//! flattened to text and each known station name is matched against a
//! nearby 1-3 digit IMECA value. When fewer than [`MIN_REAL_STATIONS`]
//! stations are found the scrape is considered broken and, if allowed, a
//! full set of simulated readings is returned so the map never renders empty.

use crate::config::Config;
use crate::fetch::Fetcher;
use crate::models::{DataOrigin, StationReading};
use crate::utils::clock_time;
use chrono::Local;
use rand::{Rng, rng};
use rand_distr::{Distribution, Normal};
use regex::{Regex, RegexBuilder};
use scraper::Html;
use tracing::{debug, error, info, instrument, warn};

/// Fewer real readings than this means the page layout changed.
pub const MIN_REAL_STATIONS: usize = 5;

/// Largest plausible IMECA value on the page.
const MAX_IMECA: u32 = 300;

/// A monitoring station of the ZMG network.
#[derive(Debug, Clone, Copy)]
pub struct Station {
    pub name: &'static str,
    pub lat: f64,
    pub lon: f64,
    profile: Profile,
}

/// Typical pollution level, used only for simulated readings.
#[derive(Debug, Clone, Copy)]
enum Profile {
    /// South: usually "Mala".
    Polluted,
    /// West and north: usually "Buena".
    Clean,
    Average,
}

impl Profile {
    /// Mean and standard deviation of the simulated IMECA value.
    fn base_and_spread(self) -> (f64, f64) {
        match self {
            Profile::Polluted => (105.0, 15.0),
            Profile::Clean => (45.0, 10.0),
            Profile::Average => (70.0, 20.0),
        }
    }

    /// Draw one IMECA value: normal around the base, truncated, clamped to 10..=190.
    fn sample_imeca<R: Rng + ?Sized>(self, rng: &mut R) -> u32 {
        let (base, spread) = self.base_and_spread();
        let value = match Normal::new(base, spread) {
            Ok(normal) => normal.sample(rng),
            Err(_) => base,
        };
        (value as i64).clamp(10, 190) as u32
    }
}

const fn station(name: &'static str, lat: f64, lon: f64, profile: Profile) -> Station {
    Station { name, lat, lon, profile }
}

/// The 13 stations of the metropolitan network.
///
/// "Vallarta" is the Av. Vallarta station in Guadalajara, not the port.
pub const STATIONS: [Station; 13] = [
    station("Las Pintas", 20.5768, -103.3265, Profile::Polluted),
    station("Miravalle", 20.6120, -103.3430, Profile::Polluted),
    station("Centro", 20.6736, -103.3440, Profile::Average),
    station("Tlaquepaque", 20.6409, -103.3125, Profile::Polluted),
    station("Vallarta", 20.6775, -103.4323, Profile::Clean),
    station("Oblatos", 20.6923, -103.2974, Profile::Average),
    station("Aguilas", 20.6350, -103.4150, Profile::Average),
    station("Loma Dorada", 20.6280, -103.2530, Profile::Average),
    station("Santa Fe", 20.5310, -103.3830, Profile::Polluted),
    station("Santa Anita", 20.5515, -103.4470, Profile::Average),
    station("Atemajac", 20.7160, -103.3560, Profile::Average),
    station("Santa Margarita", 20.7300, -103.4150, Profile::Clean),
    station("Country", 20.6950, -103.3750, Profile::Clean),
];

/// Flatten an HTML document to its visible text, one space between text nodes.
pub fn page_text(html: &str) -> String {
    let document = Html::parse_document(html);
    document
        .root_element()
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn case_insensitive(pattern: &str) -> Option<Regex> {
    RegexBuilder::new(pattern).case_insensitive(true).build().ok()
}

/// Find the IMECA value reported next to `name` in flattened page text.
///
/// A number following the name (within 30 non-digit characters) wins over
/// one preceding it, so a table row like `"Las Pintas 105 Miravalle 88"`
/// does not hand Las Pintas' value to Miravalle.
pub fn find_station_value(text: &str, name: &str) -> Option<u32> {
    let name = regex::escape(name);
    let after = case_insensitive(&format!(r"{name}\D{{0,30}}?\b(\d{{1,3}})\b"))?;
    let before = case_insensitive(&format!(r"\b(\d{{1,3}})\b\D{{0,30}}?{name}"))?;

    after
        .captures(text)
        .or_else(|| before.captures(text))
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<u32>().ok())
        .filter(|v| *v <= MAX_IMECA)
}

/// Extract every station that has a recognizable value in `text`.
pub fn parse_stations(text: &str, last_update: &str) -> Vec<StationReading> {
    STATIONS
        .iter()
        .filter_map(|s| {
            let value = find_station_value(text, s.name)?;
            debug!(station = s.name, imeca = value, "Matched station value");
            Some(StationReading::new(s.name, value, s.lat, s.lon, last_update, DataOrigin::Real))
        })
        .collect()
}

/// Simulated readings for all stations, following each station's profile.
pub fn mock_stations(last_update: &str) -> Vec<StationReading> {
    let mut rng = rng();
    STATIONS
        .iter()
        .map(|s| {
            let imeca = s.profile.sample_imeca(&mut rng);
            StationReading::new(s.name, imeca, s.lat, s.lon, last_update, DataOrigin::Mock)
        })
        .collect()
}

/// Scrape all stations, falling back to simulated data when the scrape is unusable.
///
/// # Returns
///
/// Real readings when at least [`MIN_REAL_STATIONS`] were found; otherwise
/// mock readings for all stations if `use_mock_on_error`, else whatever
/// real readings were found (possibly none).
#[instrument(level = "info", skip_all)]
pub async fn scrape_all_stations(fetcher: &Fetcher, config: &Config, use_mock_on_error: bool) -> Vec<StationReading> {
    let url = &config.sources.air_quality_url;
    let last_update = clock_time(&Local::now());

    let found = match fetcher.get(url, None).await {
        Ok(response) if response.status().is_success() => match response.text().await {
            Ok(html) => parse_stations(&page_text(&html), &last_update),
            Err(e) => {
                error!(%url, error = %e, "Failed reading air-quality page");
                Vec::new()
            }
        },
        Ok(response) => {
            warn!(%url, status = %response.status(), "Air-quality page returned an error status");
            Vec::new()
        }
        Err(e) => {
            error!(%url, error = %e, "Air-quality scrape failed");
            Vec::new()
        }
    };

    if found.len() < MIN_REAL_STATIONS && use_mock_on_error {
        warn!(found = found.len(), "Insufficient stations scraped; using simulated readings");
        return mock_stations(&last_update);
    }

    info!(count = found.len(), "Scraped air-quality stations");
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AirQualityStatus;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PAGE: &str = r#"
        <html><body>
          <h1>Calidad del aire</h1>
          <table>
            <tr><td>Las Pintas</td><td>105</td></tr>
            <tr><td>Miravalle</td><td>88</td></tr>
            <tr><td>Centro</td><td>47</td></tr>
            <tr><td>Tlaquepaque</td><td>132</td></tr>
            <tr><td>Vallarta</td><td>35</td></tr>
            <tr><td>OBLATOS</td><td>61</td></tr>
          </table>
        </body></html>"#;

    fn config_for(server: &MockServer) -> Config {
        let mut config = Config::defaults();
        config.sources.air_quality_url = format!("{}/", server.uri());
        config
    }

    #[test]
    fn test_page_text_joins_text_nodes() {
        let text = page_text("<p>Las Pintas</p>\n<span> 105 </span>");
        assert_eq!(text, "Las Pintas 105");
    }

    #[test]
    fn test_find_station_value_prefers_following_number() {
        let text = "Las Pintas 105 Miravalle 88 Centro";
        assert_eq!(find_station_value(text, "Las Pintas"), Some(105));
        assert_eq!(find_station_value(text, "Miravalle"), Some(88));
        // Nothing after Centro, so the preceding number is used.
        assert_eq!(find_station_value(text, "Centro"), Some(88));
    }

    #[test]
    fn test_find_station_value_rejects_out_of_range_and_long_numbers() {
        assert_eq!(find_station_value("Country 999", "Country"), None);
        assert_eq!(find_station_value("Country actualizado 2025", "Country"), None);
        assert_eq!(find_station_value("country: 42 puntos", "Country"), Some(42));
    }

    #[test]
    fn test_parse_stations_from_page() {
        let readings = parse_stations(&page_text(PAGE), "09:00");
        assert_eq!(readings.len(), 6);
        let pintas = readings.iter().find(|r| r.station == "Las Pintas").unwrap();
        assert_eq!(pintas.imeca, 105);
        assert_eq!(pintas.status, AirQualityStatus::Mala);
        assert_eq!(pintas.source, DataOrigin::Real);
        let oblatos = readings.iter().find(|r| r.station == "Oblatos").unwrap();
        assert_eq!(oblatos.imeca, 61);
    }

    #[test]
    fn test_mock_stations_cover_network_within_bounds() {
        let readings = mock_stations("10:30");
        assert_eq!(readings.len(), STATIONS.len());
        for r in &readings {
            assert!((10..=190).contains(&r.imeca), "{} out of range", r.imeca);
            assert_eq!(r.source, DataOrigin::Mock);
            assert_eq!(r.status, AirQualityStatus::from_imeca(r.imeca));
        }
    }

    #[test]
    fn test_mock_imeca_is_normal_around_profile_base() {
        let mut rng = StdRng::seed_from_u64(7);
        let draws: Vec<u32> = (0..2000).map(|_| Profile::Polluted.sample_imeca(&mut rng)).collect();

        let mean = draws.iter().map(|&v| v as f64).sum::<f64>() / draws.len() as f64;
        assert!((mean - 105.0).abs() < 2.0, "mean {mean}");
        // One standard deviation either side holds about two thirds of the draws.
        let outside = draws.iter().filter(|v| !(90..=120).contains(*v)).count();
        assert!(outside > 400 && outside < 900, "{outside} draws outside 90..=120");
        assert!(draws.iter().all(|v| (10..=190).contains(v)));
    }

    #[tokio::test]
    async fn test_scrape_uses_real_readings_when_enough_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(PAGE))
            .mount(&server)
            .await;

        let config = config_for(&server);
        let fetcher = Fetcher::new(&config.http).unwrap();
        let readings = scrape_all_stations(&fetcher, &config, true).await;
        assert_eq!(readings.len(), 6);
        assert!(readings.iter().all(|r| r.source == DataOrigin::Real));
    }

    #[tokio::test]
    async fn test_scrape_falls_back_to_mock() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<p>Las Pintas 105</p>"))
            .mount(&server)
            .await;

        let config = config_for(&server);
        let fetcher = Fetcher::new(&config.http).unwrap();

        let with_mock = scrape_all_stations(&fetcher, &config, true).await;
        assert_eq!(with_mock.len(), STATIONS.len());
        assert!(with_mock.iter().all(|r| r.source == DataOrigin::Mock));

        let without_mock = scrape_all_stations(&fetcher, &config, false).await;
        assert_eq!(without_mock.len(), 1);
    }

    #[tokio::test]
    async fn test_scrape_error_status_without_mock_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let config = config_for(&server);
        let fetcher = Fetcher::new(&config.http).unwrap();
        assert!(scrape_all_stations(&fetcher, &config, false).await.is_empty());
    }
}
