//! Command-line interface definitions for GDL Insight.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Most arguments can also be provided via environment variables (or a `.env` file).

use clap::Parser;

/// Command-line arguments for one GDL Insight run.
///
/// # Examples
///
/// ```sh
/// # Full run with summaries
/// gdl_insight -o ./output --gemini-api-key YOUR_KEY
///
/// # Quick run: no model calls, cached news ignored
/// gdl_insight -o ./output --no-ai --refresh
///
/// # Custom YAML config and a six hour cache window
/// gdl_insight -o ./output --config ./gdl_insight.yaml --max-age-hours 6
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Output directory for digest.json and briefing.html
    #[arg(short, long, env = "GDL_OUTPUT_DIR")]
    pub output_dir: String,

    /// Directory holding the daily news cache snapshots
    #[arg(short, long, env = "GDL_CACHE_DIR", default_value = "cache")]
    pub cache_dir: String,

    /// Optional path to a YAML config file
    #[arg(long, env = "GDL_CONFIG")]
    pub config: Option<String>,

    /// Items per news topic (overrides the config file)
    #[arg(long)]
    pub max_items: Option<usize>,

    /// Skip Gemini summaries and keep feed descriptions
    #[arg(long)]
    pub no_ai: bool,

    /// Report missing readings instead of simulated ones
    #[arg(long)]
    pub no_mock: bool,

    /// Ignore today's cache snapshots and fetch again
    #[arg(long)]
    pub refresh: bool,

    /// Treat snapshots older than this many hours as stale (1 to 8760)
    #[arg(long, env = "GDL_MAX_AGE_HOURS", value_parser = clap::value_parser!(u64).range(1..=8760))]
    pub max_age_hours: Option<u64>,

    /// Gemini API key (falls back to GOOGLE_API_KEY and GOOGLE_AI_API_KEY)
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub gemini_api_key: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::parse_from(&[
            "gdl_insight",
            "--output-dir",
            "./output",
            "--cache-dir",
            "./cache",
            "--max-items",
            "8",
        ]);

        assert_eq!(cli.output_dir, "./output");
        assert_eq!(cli.cache_dir, "./cache");
        assert_eq!(cli.max_items, Some(8));
        assert!(!cli.no_ai);
        assert!(!cli.refresh);
    }

    #[test]
    fn test_cli_short_flags_and_switches() {
        let cli = Cli::parse_from(&[
            "gdl_insight",
            "-o",
            "/tmp/out",
            "-c",
            "/tmp/cache",
            "--no-ai",
            "--no-mock",
            "--refresh",
            "--max-age-hours",
            "6",
        ]);

        assert_eq!(cli.output_dir, "/tmp/out");
        assert_eq!(cli.cache_dir, "/tmp/cache");
        assert!(cli.no_ai);
        assert!(cli.no_mock);
        assert!(cli.refresh);
        assert_eq!(cli.max_age_hours, Some(6));
    }

    #[test]
    fn test_cli_rejects_out_of_range_max_age() {
        for bad in ["0", "8761", "3000000000000", "-1"] {
            let parsed = Cli::try_parse_from(&["gdl_insight", "-o", "/tmp/out", "--max-age-hours", bad]);
            assert!(parsed.is_err(), "accepted --max-age-hours {bad}");
        }
        let cli = Cli::parse_from(&["gdl_insight", "-o", "/tmp/out", "--max-age-hours", "8760"]);
        assert_eq!(cli.max_age_hours, Some(8760));
    }

    #[test]
    fn test_cli_requires_output_dir() {
        // Only meaningful when the env fallback is not set in the test environment.
        if std::env::var("GDL_OUTPUT_DIR").is_err() {
            assert!(Cli::try_parse_from(&["gdl_insight"]).is_err());
        }
    }
}
