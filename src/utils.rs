//! Utility functions for text cleanup, logging previews, dates and file system checks.
//!
//! This module provides helper functions used throughout the application:
//! - HTML stripping for RSS descriptions
//! - Character-safe truncation for log previews
//! - HTML escaping for the briefing body
//! - Local date/time formatting shared by the cache and outputs
//! - File system validation for output directories

use chrono::{DateTime, Local, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fs as stdfs;
use tokio::fs;
use tracing::{info, instrument};

static HTML_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("valid tag regex"));

/// Remove HTML tags from a fragment and trim the result.
///
/// Google News descriptions are small HTML fragments (`<a>` plus `<font>`),
/// so a tag-stripping regex is enough. `&nbsp;` survives XML unescaping as
/// literal text and is turned into a plain space.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(strip_html("<a href=\"x\">Hola</a>&nbsp;mundo"), "Hola mundo");
/// ```
pub fn strip_html(fragment: &str) -> String {
    HTML_TAG
        .replace_all(fragment, "")
        .replace("&nbsp;", " ")
        .trim()
        .to_string()
}

/// Truncate a string for logging purposes.
///
/// Long strings are truncated to `max` characters with an ellipsis and
/// byte count indicator appended.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        None => s.to_string(),
        Some((cut, _)) => format!("{}…(+{} bytes)", &s[..cut], s.len() - cut),
    }
}

/// Escape the five characters that are significant in HTML text and attributes.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

/// Local calendar date in `YYYY-MM-DD` format, the key of daily snapshots.
pub fn local_date(now: &DateTime<Local>) -> String {
    now.format("%Y-%m-%d").to_string()
}

/// Local wall-clock time as `HH:MM`, used for reading timestamps.
pub fn clock_time(now: &DateTime<Local>) -> String {
    now.format("%H:%M").to_string()
}

/// Turn a `YYYY-MM-DD` date into `dd/mm` for the briefing subject and header.
///
/// Anything that does not parse is returned unchanged.
pub fn day_month(local_date: &str) -> String {
    NaiveDate::parse_from_str(local_date, "%Y-%m-%d")
        .map(|d| d.format("%d/%m").to_string())
        .unwrap_or_else(|_| local_date.to_string())
}

/// Ensure a directory exists and is writable.
///
/// This function creates the directory if it doesn't exist, then performs
/// a write test by creating and immediately deleting a probe file.
///
/// # Errors
///
/// Returns an error if:
/// - The directory cannot be created
/// - The directory is not writable (permission denied, read-only filesystem, etc.)
#[instrument(level = "info", skip_all, fields(path = %path))]
pub async fn ensure_writable_dir(path: &str) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(path).await?;
    // Try a small sync write using std fs (simpler error surface)
    let probe_path = format!("{}/..__probe_write__", path.trim_end_matches('/'));
    stdfs::File::create(&probe_path)?;
    let _ = stdfs::remove_file(&probe_path);
    info!("Directory is writable");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_strip_html_google_news_fragment() {
        let raw = r##"<a href="https://news.google.com/x" target="_blank">Lluvias en Zapopan</a>&nbsp;&nbsp;<font color="#6f6f6f">Milenio</font>"##;
        assert_eq!(strip_html(raw), "Lluvias en Zapopan  Milenio");
    }

    #[test]
    fn test_strip_html_plain_text_is_trimmed() {
        assert_eq!(strip_html("  texto plano \n"), "texto plano");
        assert_eq!(strip_html(""), "");
    }

    #[test]
    fn test_truncate_for_log_short_string() {
        let s = "Hello, world!";
        assert_eq!(truncate_for_log(s, 100), "Hello, world!");
    }

    #[test]
    fn test_truncate_for_log_long_string() {
        let s = "a".repeat(500);
        let result = truncate_for_log(&s, 100);
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(result.contains("…(+400 bytes)"));
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"Chivas & "Rebaño" <3 'gol'"#),
            "Chivas &amp; &quot;Rebaño&quot; &lt;3 &#39;gol&#39;"
        );
    }

    #[test]
    fn test_date_formats() {
        let now = Local.with_ymd_and_hms(2025, 3, 7, 9, 5, 0).unwrap();
        assert_eq!(local_date(&now), "2025-03-07");
        assert_eq!(clock_time(&now), "09:05");
        assert_eq!(day_month(&local_date(&now)), "07/03");
        assert_eq!(day_month("hoy"), "hoy");
    }

    #[tokio::test]
    async fn test_ensure_writable_dir_creates_missing_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("out/daily");
        let nested = nested.to_str().unwrap();
        ensure_writable_dir(nested).await.unwrap();
        assert!(std::path::Path::new(nested).is_dir());
        assert!(!std::path::Path::new(&format!("{nested}/..__probe_write__")).exists());
    }
}
