//! Data models for environmental readings, news items and the daily digest.
//!
//! This module defines the core data structures used throughout the application:
//! - [`StationReading`]: One IMECA air-quality reading for a ZMG monitoring station
//! - [`ChapalaLevel`]: Lake Chapala water level in metres above sea level
//! - [`NewsItem`]: A feed entry, optionally summarized by the generative API
//! - [`Digest`]: Everything gathered in one run, serialized for the dashboard
//!
//! Field names are snake_case in JSON because the cache snapshots and the
//! digest are consumed by the dashboard with those exact keys.

use serde::{Deserialize, Serialize};

/// Air-quality category derived from an IMECA value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum AirQualityStatus {
    Buena,
    Regular,
    Mala,
    #[serde(rename = "Muy Mala")]
    MuyMala,
    #[serde(rename = "Extremadamente Mala")]
    ExtremadamenteMala,
}

impl AirQualityStatus {
    /// Classify an IMECA value.
    ///
    /// | IMECA | Status |
    /// |-------|--------|
    /// | 0-50 | Buena |
    /// | 51-100 | Regular |
    /// | 101-150 | Mala |
    /// | 151-200 | Muy Mala |
    /// | >200 | Extremadamente Mala |
    pub fn from_imeca(imeca: u32) -> Self {
        match imeca {
            0..=50 => Self::Buena,
            51..=100 => Self::Regular,
            101..=150 => Self::Mala,
            151..=200 => Self::MuyMala,
            _ => Self::ExtremadamenteMala,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Buena => "Buena",
            Self::Regular => "Regular",
            Self::Mala => "Mala",
            Self::MuyMala => "Muy Mala",
            Self::ExtremadamenteMala => "Extremadamente Mala",
        }
    }

    /// Display color used by the dashboard map and the briefing.
    pub fn color(&self) -> &'static str {
        match self {
            Self::Buena => "#00E400",
            Self::Regular => "#FFFF00",
            Self::Mala => "#FF7E00",
            Self::MuyMala => "#FF0000",
            Self::ExtremadamenteMala => "#7E0023",
        }
    }
}

/// Whether a value was scraped from the live site or simulated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DataOrigin {
    Real,
    Mock,
}

/// One air-quality reading for a monitoring station.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct StationReading {
    /// Official station name, e.g. `"Las Pintas"`.
    pub station: String,
    /// IMECA index value.
    pub imeca: u32,
    pub status: AirQualityStatus,
    /// Display color of `status`, used by the dashboard map markers.
    pub color: String,
    pub lat: f64,
    pub lon: f64,
    /// Local time of the reading as `HH:MM`.
    pub last_update: String,
    pub source: DataOrigin,
}

impl StationReading {
    pub fn new(station: &str, imeca: u32, lat: f64, lon: f64, last_update: &str, source: DataOrigin) -> Self {
        let status = AirQualityStatus::from_imeca(imeca);
        Self {
            station: station.to_string(),
            imeca,
            status,
            color: status.color().to_string(),
            lat,
            lon,
            last_update: last_update.to_string(),
            source,
        }
    }
}

/// The station with the highest IMECA value, the headline figure of the briefing.
pub fn worst_station(readings: &[StationReading]) -> Option<&StationReading> {
    readings.iter().max_by_key(|r| r.imeca)
}

/// Lake Chapala water level.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ChapalaLevel {
    pub level_msnm: f64,
    /// Always `"msnm"`.
    pub unit: String,
    pub last_update: String,
    pub source: DataOrigin,
}

/// A news entry as cached and rendered.
///
/// `ai_summary` is always populated: with the model output when
/// `processed` is true, otherwise with the description (or a truncated
/// fallback when summarization was requested but unavailable).
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct NewsItem {
    pub title: String,
    pub description: String,
    pub link: String,
    /// Publisher name from the feed's `<source>` element.
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published: Option<String>,
    pub ai_summary: String,
    pub processed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Everything gathered by one run.
///
/// Serialized to `<output>/<date>/digest.json` for the dashboard and used
/// as the input of the briefing composer.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Digest {
    /// The date of the run in `YYYY-MM-DD` format.
    pub local_date: String,
    /// Local time of the run as `HH:MM`.
    pub local_time: String,
    pub stations: Vec<StationReading>,
    pub worst_station: Option<StationReading>,
    pub chapala: Option<ChapalaLevel>,
    pub environment_news: Vec<NewsItem>,
    pub sports_news: Vec<NewsItem>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(station: &str, imeca: u32) -> StationReading {
        StationReading::new(station, imeca, 20.0, -103.0, "08:00", DataOrigin::Real)
    }

    #[test]
    fn test_status_thresholds() {
        assert_eq!(AirQualityStatus::from_imeca(0), AirQualityStatus::Buena);
        assert_eq!(AirQualityStatus::from_imeca(50), AirQualityStatus::Buena);
        assert_eq!(AirQualityStatus::from_imeca(51), AirQualityStatus::Regular);
        assert_eq!(AirQualityStatus::from_imeca(100), AirQualityStatus::Regular);
        assert_eq!(AirQualityStatus::from_imeca(150), AirQualityStatus::Mala);
        assert_eq!(AirQualityStatus::from_imeca(200), AirQualityStatus::MuyMala);
        assert_eq!(AirQualityStatus::from_imeca(201), AirQualityStatus::ExtremadamenteMala);
    }

    #[test]
    fn test_status_serializes_with_display_label() {
        let json = serde_json::to_string(&AirQualityStatus::MuyMala).unwrap();
        assert_eq!(json, "\"Muy Mala\"");
        assert_eq!(AirQualityStatus::MuyMala.label(), "Muy Mala");
        assert_eq!(AirQualityStatus::Mala.color(), "#FF7E00");
    }

    #[test]
    fn test_reading_status_follows_imeca() {
        let r = reading("Centro", 120);
        assert_eq!(r.status, AirQualityStatus::Mala);
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["source"], "real");
        assert_eq!(json["status"], "Mala");
        assert_eq!(json["color"], "#FF7E00");
    }

    #[test]
    fn test_worst_station() {
        let readings = vec![reading("Centro", 60), reading("Las Pintas", 130), reading("Country", 40)];
        assert_eq!(worst_station(&readings).unwrap().station, "Las Pintas");
        assert!(worst_station(&[]).is_none());
    }

    #[test]
    fn test_news_item_optional_fields_default() {
        let json = r#"{
            "title": "Chivas gana",
            "description": "Resumen",
            "link": "https://example.com/a",
            "source": "Récord",
            "ai_summary": "Resumen",
            "processed": false
        }"#;

        let item: NewsItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.published, None);
        assert_eq!(item.error, None);
        let back = serde_json::to_string(&item).unwrap();
        assert!(!back.contains("error"));
    }
}
