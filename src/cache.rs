//! Daily JSON snapshots that spare the network within a refresh window.
//!
//! Each news domain owns one file in the cache directory:
//!
//! ```text
//! cache_dir/
//! ├── cache_env_news.json
//! └── cache_chivas_news.json
//! ```
//!
//! with the shape
//!
//! ```json
//! { "date": "2025-05-06", "fetched_at": "2025-05-06T07:00:12-06:00", "data": [ ... ] }
//! ```
//!
//! A snapshot is reused only on the local day it was written and, when a
//! maximum age is configured, only while it is younger than that age.
//! Anything unreadable is a miss, never an error.

use crate::utils::local_date;
use chrono::{DateTime, Duration, Local};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, instrument, warn};

/// On-disk envelope around the cached data.
#[derive(Debug, Deserialize, Serialize)]
pub struct CacheSnapshot<T> {
    /// Local date the snapshot was written, `YYYY-MM-DD`.
    pub date: String,
    /// Absent in snapshots written before the age check existed.
    #[serde(default)]
    pub fetched_at: Option<DateTime<Local>>,
    pub data: T,
}

/// Decide whether a snapshot written on `date` at `fetched_at` can still be used at `now`.
pub fn is_fresh(
    date: &str,
    fetched_at: Option<&DateTime<Local>>,
    now: &DateTime<Local>,
    max_age: Option<Duration>,
) -> bool {
    if date != local_date(now) {
        return false;
    }
    match (max_age, fetched_at) {
        (Some(max_age), Some(fetched_at)) => *now - *fetched_at < max_age,
        _ => true,
    }
}

/// Reads and writes snapshots inside one directory.
#[derive(Debug, Clone)]
pub struct DailyCache {
    dir: PathBuf,
    max_age: Option<Duration>,
}

impl DailyCache {
    /// `max_age_hours` adds an age limit on top of the same-day rule.
    ///
    /// Hours beyond what a `Duration` can hold leave only the same-day rule.
    pub fn new(dir: impl Into<PathBuf>, max_age_hours: Option<u64>) -> Self {
        let max_age = max_age_hours.and_then(|h| i64::try_from(h).ok().and_then(Duration::try_hours));
        if max_age_hours.is_some() && max_age.is_none() {
            warn!(?max_age_hours, "Cache max age out of range; using the same-day rule only");
        }
        Self { dir: dir.into(), max_age }
    }

    pub fn path(&self, filename: &str) -> PathBuf {
        self.dir.join(filename)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Load today's data for `filename`, or `None` on any kind of miss.
    pub async fn load<T: DeserializeOwned>(&self, filename: &str) -> Option<T> {
        self.load_at(filename, &Local::now()).await
    }

    #[instrument(level = "info", skip(self, now), fields(file = %filename))]
    pub async fn load_at<T: DeserializeOwned>(&self, filename: &str, now: &DateTime<Local>) -> Option<T> {
        let path = self.path(filename);
        let raw = match fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "No cache snapshot");
                return None;
            }
        };

        let snapshot: CacheSnapshot<T> = match serde_json::from_str(&raw) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Unreadable cache snapshot; treating as miss");
                return None;
            }
        };

        if is_fresh(&snapshot.date, snapshot.fetched_at.as_ref(), now, self.max_age) {
            info!(path = %path.display(), date = %snapshot.date, "Using today's cache snapshot");
            Some(snapshot.data)
        } else {
            info!(path = %path.display(), date = %snapshot.date, "Cache snapshot expired");
            None
        }
    }

    /// Write `data` as today's snapshot for `filename`.
    pub async fn save<T: Serialize + ?Sized>(&self, filename: &str, data: &T) -> Result<(), Box<dyn Error>> {
        self.save_at(filename, data, Local::now()).await
    }

    #[instrument(level = "info", skip(self, data, now), fields(file = %filename))]
    pub async fn save_at<T: Serialize + ?Sized>(
        &self,
        filename: &str,
        data: &T,
        now: DateTime<Local>,
    ) -> Result<(), Box<dyn Error>> {
        let snapshot = CacheSnapshot {
            date: local_date(&now),
            fetched_at: Some(now),
            data,
        };

        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        snapshot.serialize(&mut ser)?;

        fs::create_dir_all(&self.dir).await?;
        let path = self.path(filename);
        fs::write(&path, buf).await?;
        info!(path = %path.display(), "Saved cache snapshot");
        Ok(())
    }
}
