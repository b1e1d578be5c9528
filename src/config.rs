//! Runtime configuration loaded from an optional YAML file.
//!
//! Every field has a default, so the application runs without a config
//! file and a partial file only overrides what it names:
//!
//! ```yaml
//! sports_news:
//!   query: "Chivas Guadalajara Liga MX"
//!   max_items: 8
//! briefing:
//!   recipient_name: "Ivan"
//! ```

use serde::Deserialize;
use std::error::Error;
use std::path::Path;
use tracing::{info, instrument, warn};

/// Environment variables checked, in order, for the Gemini API key.
pub const API_KEY_VARS: [&str; 3] = ["GEMINI_API_KEY", "GOOGLE_API_KEY", "GOOGLE_AI_API_KEY"];

#[derive(Debug, Clone)]
pub struct Config {
    pub http: HttpSettings,
    pub sources: SourceSettings,
    pub gemini: GeminiSettings,
    pub environment_news: TopicSettings,
    pub sports_news: TopicSettings,
    pub briefing: BriefingSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    /// User agent for the environmental scrapers.
    pub user_agent: String,
    /// Full desktop browser user agent, required by Google News.
    pub browser_user_agent: String,
    pub timeout_secs: u64,
    /// The Chapala page is slow to fail; it gets a shorter timeout.
    pub chapala_timeout_secs: u64,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".to_string(),
            browser_user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36".to_string(),
            timeout_secs: 10,
            chapala_timeout_secs: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourceSettings {
    pub air_quality_url: String,
    pub chapala_level_url: String,
    /// Google News RSS search endpoint; the query string is appended per topic.
    pub google_news_rss_url: String,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            air_quality_url: "https://aire.jalisco.gob.mx/".to_string(),
            chapala_level_url: "https://www.ceajalisco.gob.mx/contenido/chapala/chapala/cota.html".to_string(),
            google_news_rss_url: "https://news.google.com/rss/search".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeminiSettings {
    pub base_url: String,
    pub max_retries: usize,
    pub base_delay_ms: u64,
    /// Never read from the file; filled from the CLI or environment.
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl Default for GeminiSettings {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            max_retries: 3,
            base_delay_ms: 1000,
            api_key: None,
        }
    }
}

/// Settings for one news domain. Defaults are those of the environment
/// topic; [`TopicSettings::sports`] has the sports values.
#[derive(Debug, Clone)]
pub struct TopicSettings {
    /// Google News search terms.
    pub query: String,
    pub max_items: usize,
    /// Models tried in order until one answers.
    pub models: Vec<String>,
    /// Snapshot filename inside the cache directory.
    pub cache_file: String,
}

impl Default for TopicSettings {
    fn default() -> Self {
        Self {
            query: "Medio ambiente Guadalajara".to_string(),
            max_items: 5,
            models: vec!["gemini-2.5-flash".to_string()],
            cache_file: "cache_env_news.json".to_string(),
        }
    }
}

impl TopicSettings {
    pub fn sports() -> Self {
        Self {
            query: "Chivas Guadalajara".to_string(),
            max_items: 5,
            models: vec!["gemini-2.5-flash-lite".to_string(), "gemini-2.5-flash".to_string()],
            cache_file: "cache_chivas_news.json".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BriefingSettings {
    pub sender_name: String,
    /// Address handed to the mail collaborator, if any.
    pub recipient: Option<String>,
    /// Name used in the closing greeting.
    pub recipient_name: Option<String>,
    pub dashboard_url: String,
    /// Items per section in the email.
    pub max_items: usize,
}

impl Default for BriefingSettings {
    fn default() -> Self {
        Self {
            sender_name: "GDL Insight - AI Agent".to_string(),
            recipient: None,
            recipient_name: None,
            dashboard_url: "https://eco-and-rebano-tracker.streamlit.app/".to_string(),
            max_items: 4,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    #[serde(default)]
    http: HttpSettings,
    #[serde(default)]
    sources: SourceSettings,
    #[serde(default)]
    gemini: GeminiSettings,
    environment_news: Option<PartialTopic>,
    sports_news: Option<PartialTopic>,
    #[serde(default)]
    briefing: BriefingSettings,
}

/// A topic section as written in the file; omitted fields take the
/// defaults of whichever topic the section configures.
#[derive(Debug, Default, Deserialize)]
struct PartialTopic {
    query: Option<String>,
    max_items: Option<usize>,
    models: Option<Vec<String>>,
    cache_file: Option<String>,
}

impl PartialTopic {
    fn over(self, defaults: TopicSettings) -> TopicSettings {
        TopicSettings {
            query: self.query.unwrap_or(defaults.query),
            max_items: self.max_items.unwrap_or(defaults.max_items),
            models: self.models.unwrap_or(defaults.models),
            cache_file: self.cache_file.unwrap_or(defaults.cache_file),
        }
    }
}

impl From<RawConfig> for Config {
    fn from(raw: RawConfig) -> Self {
        Self {
            http: raw.http,
            sources: raw.sources,
            gemini: raw.gemini,
            environment_news: raw.environment_news.unwrap_or_default().over(TopicSettings::default()),
            sports_news: raw.sports_news.unwrap_or_default().over(TopicSettings::sports()),
            briefing: raw.briefing,
        }
    }
}

impl Config {
    /// Built-in configuration with both topics at their own defaults.
    pub fn defaults() -> Self {
        RawConfig::default().into()
    }

    /// Parse a YAML document, filling anything missing with defaults.
    pub fn from_yaml(yaml: &str) -> Result<Self, Box<dyn Error>> {
        if yaml.trim().is_empty() {
            return Ok(Self::defaults());
        }
        let raw: RawConfig = serde_yaml::from_str(yaml)?;
        Ok(raw.into())
    }
}

/// Load the configuration from `path`, or the defaults when no path is given.
///
/// A path that does not exist is an error: the user asked for that file.
#[instrument(level = "info")]
pub fn load_config(path: Option<&str>) -> Result<Config, Box<dyn Error>> {
    match path {
        Some(path) => {
            if !Path::new(path).exists() {
                return Err(format!("config file not found: {path}").into());
            }
            let yaml = std::fs::read_to_string(path)?;
            let config = Config::from_yaml(&yaml)?;
            info!(config_path = path, "Loaded configuration");
            Ok(config)
        }
        None => {
            info!("No config file given; using defaults");
            Ok(Config::defaults())
        }
    }
}

/// Pick the Gemini API key: explicit value first, then [`API_KEY_VARS`] in order.
pub fn resolve_api_key(explicit: Option<String>) -> Option<String> {
    resolve_api_key_with(explicit, |name| std::env::var(name).ok())
}

fn resolve_api_key_with<F>(explicit: Option<String>, lookup: F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    let key = explicit
        .filter(|k| !k.trim().is_empty())
        .or_else(|| API_KEY_VARS.iter().find_map(|var| lookup(var).filter(|k| !k.trim().is_empty())));
    if key.is_none() {
        warn!(vars = ?API_KEY_VARS, "No Gemini API key found; summaries will fall back to descriptions");
    }
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_keep_topics_apart() {
        let config = Config::defaults();
        assert_eq!(config.environment_news.cache_file, "cache_env_news.json");
        assert_eq!(config.sports_news.cache_file, "cache_chivas_news.json");
        assert_eq!(config.sports_news.models, vec!["gemini-2.5-flash-lite", "gemini-2.5-flash"]);
        assert_eq!(config.http.timeout_secs, 10);
        assert_eq!(config.briefing.max_items, 4);
    }

    #[test]
    fn test_partial_yaml_overrides_only_named_fields() {
        let yaml = r#"
sports_news:
  max_items: 8
briefing:
  recipient_name: "Ivan"
gemini:
  max_retries: 1
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.sports_news.max_items, 8);
        assert_eq!(config.sports_news.query, "Chivas Guadalajara");
        assert_eq!(config.sports_news.cache_file, "cache_chivas_news.json");
        assert_eq!(config.environment_news.query, "Medio ambiente Guadalajara");
        assert_eq!(config.briefing.recipient_name.as_deref(), Some("Ivan"));
        assert_eq!(config.gemini.max_retries, 1);
        assert_eq!(config.gemini.base_delay_ms, 1000);
    }

    #[test]
    fn test_empty_yaml_is_defaults() {
        let config = Config::from_yaml("").unwrap();
        assert_eq!(config.sources.air_quality_url, "https://aire.jalisco.gob.mx/");
    }

    #[test]
    fn test_invalid_yaml_is_error() {
        assert!(Config::from_yaml("http: [1, 2").is_err());
    }

    #[test]
    fn test_missing_config_file_is_error() {
        assert!(load_config(Some("/definitely/not/here.yaml")).is_err());
    }

    #[test]
    fn test_api_key_resolution_order() {
        let env = |name: &str| match name {
            "GOOGLE_API_KEY" => Some("google".to_string()),
            "GOOGLE_AI_API_KEY" => Some("google-ai".to_string()),
            _ => None,
        };
        assert_eq!(resolve_api_key_with(None, env), Some("google".to_string()));
        assert_eq!(resolve_api_key_with(Some("flag".to_string()), env), Some("flag".to_string()));
        assert_eq!(resolve_api_key_with(Some("  ".to_string()), |_| None), None);
    }
}
