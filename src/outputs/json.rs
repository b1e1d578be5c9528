//! JSON digest for the dashboard.
//!
//! One file per day, rewritten by every run of that day:
//! ```text
//! output_dir/
//! └── 2025-05-06/
//!     └── digest.json
//! ```

use crate::models::Digest;
use std::error::Error;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{error, info, instrument};

/// Write a [`Digest`] to `{output_dir}/{local_date}/digest.json`.
///
/// Returns the path written, or an error if the directory cannot be
/// created or the file cannot be written.
#[instrument(level = "info", skip_all, fields(output_dir = %output_dir, date = %digest.local_date))]
pub async fn write_digest(digest: &Digest, output_dir: &str) -> Result<PathBuf, Box<dyn Error>> {
    let json = serde_json::to_string_pretty(digest)?;

    let dir = Path::new(output_dir).join(&digest.local_date);
    info!(dir = %dir.display(), "Ensuring JSON directory exists");
    if let Err(e) = fs::create_dir_all(&dir).await {
        error!(dir = %dir.display(), error = %e, "Failed to create JSON dir");
        return Err(e.into());
    }

    let path = dir.join("digest.json");
    fs::write(&path, json).await?;
    info!(
        path = %path.display(),
        stations = digest.stations.len(),
        environment_news = digest.environment_news.len(),
        sports_news = digest.sports_news.len(),
        "Wrote digest"
    );
    Ok(path)
}
