//! Gemini API interaction with exponential backoff retry logic.
//!
//! This module provides the "AI filter" of the pipeline: a prompt goes to
//! Google's Gemini `generateContent` endpoint and a cleaned summary comes
//! back.
//!
//! # Architecture
//!
//! - [`AskAsync`]: Core trait defining async model interaction
//! - [`GeminiModel`]: One Gemini model reached over REST
//! - [`RetryAsk`]: Decorator that adds retry logic to any `AskAsync` implementation
//! - [`Summarizer`]: Tries a list of models in order, each with retries
//!
//! # Retry Strategy
//!
//! - Only transient failures are retried (timeouts, connection errors, 429, 5xx)
//! - Exponential backoff starting at the configured base delay
//! - Maximum delay capped at 30 seconds
//! - Random jitter (0-250ms) added to prevent thundering herd

use crate::config::GeminiSettings;
use crate::utils::truncate_for_log;
use rand::{Rng, rng};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;
use std::time::{Duration as StdDuration, Instant};
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};

/// Trait for async model interaction.
///
/// Implementors of this trait can send text to a model and receive a response.
/// This abstraction allows for different backends or decorators (like retry logic).
pub trait AskAsync {
    /// The type of response returned by the model.
    type Response;

    /// Send text to the model and receive a response.
    async fn ask(&self, text: &str) -> Result<Self::Response, Box<dyn Error>>;
}

/// Whether an error message describes a failure worth retrying.
pub fn is_transient_error(err: &str) -> bool {
    let transient_patterns = [
        "timeout",
        "timed out",
        "connection",
        "rate limit",
        "429",
        "500",
        "502",
        "503",
        "504",
        "temporarily",
        "overloaded",
    ];

    let err_lower = err.to_lowercase();
    transient_patterns.iter().any(|p| err_lower.contains(p))
}

/// Wrapper that adds exponential backoff retry logic to any [`AskAsync`] implementation.
///
/// # Backoff Strategy
///
/// The delay between retries follows this formula:
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
/// ```
pub struct RetryAsk<T> {
    /// The underlying client to wrap.
    inner: T,
    /// Maximum number of retry attempts before giving up.
    max_retries: usize,
    /// Initial delay between retries (doubles with each attempt).
    base_delay: StdDuration,
    /// Maximum delay cap to prevent excessive waiting.
    max_delay: StdDuration,
}

impl<T> RetryAsk<T>
where
    T: AskAsync,
{
    pub fn new(inner: T, max_retries: usize, base_delay: StdDuration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: StdDuration::from_secs(30),
        }
    }
}

impl<T> fmt::Debug for RetryAsk<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryAsk")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T> AskAsync for RetryAsk<T>
where
    T: AskAsync + fmt::Debug,
{
    type Response = T::Response;

    #[instrument(level = "info", skip_all)]
    async fn ask(&self, text: &str) -> Result<Self::Response, Box<dyn Error>> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            let attempt_t0 = Instant::now();
            match self.inner.ask(text).await {
                Ok(resp) => {
                    return Ok(resp);
                }
                Err(e) => {
                    attempt += 1;
                    let attempt_dt = attempt_t0.elapsed();
                    let total_dt = total_t0.elapsed();

                    if !is_transient_error(&e.to_string()) {
                        error!(attempt, error = %e, "ask() failed permanently; not retrying");
                        return Err(e);
                    }

                    if attempt > self.max_retries {
                        error!(
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_attempt = attempt_dt.as_millis(),
                            elapsed_ms_total = total_dt.as_millis(),
                            error = %e,
                            "ask() exhausted retries"
                        );
                        return Err(e);
                    }

                    // backoff calc
                    let shift = u32::try_from(attempt - 1).unwrap_or(u32::MAX).min(16);
                    let delay = self.base_delay.saturating_mul(1 << shift).min(self.max_delay);
                    let jitter_ms: u64 = rng().random_range(0..=250);
                    let delay = delay + StdDuration::from_millis(jitter_ms);

                    warn!(
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_attempt = attempt_dt.as_millis(),
                        elapsed_ms_total = total_dt.as_millis(),
                        ?delay,
                        error = %e,
                        "ask() attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

// --- Gemini wire types ---

#[derive(Serialize, Deserialize, Debug)]
pub struct GeminiPart {
    pub text: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct GeminiContent {
    pub parts: Vec<GeminiPart>,
}

#[derive(Serialize, Debug)]
pub struct GeminiRequest {
    pub contents: Vec<GeminiContent>,
}

#[derive(Deserialize, Debug)]
pub struct GeminiCandidate {
    pub content: GeminiContent,
}

#[derive(Deserialize, Debug)]
pub struct GeminiResponse {
    pub candidates: Option<Vec<GeminiCandidate>>,
    pub error: Option<GeminiError>,
}

#[derive(Deserialize, Debug)]
pub struct GeminiError {
    pub message: String,
}

impl GeminiResponse {
    /// Concatenated text of the first candidate, if any.
    pub fn text(&self) -> Option<String> {
        let first = self.candidates.as_ref()?.first()?;
        let text: String = first.content.parts.iter().map(|p| p.text.as_str()).collect();
        let text = text.trim();
        (!text.is_empty()).then(|| text.to_string())
    }
}

/// One Gemini model reached through `generateContent`.
pub struct GeminiModel<'a> {
    pub client: &'a Client,
    pub base_url: &'a str,
    pub api_key: &'a str,
    pub model: &'a str,
}

impl fmt::Debug for GeminiModel<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // api_key stays out of logs
        f.debug_struct("GeminiModel")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

impl AskAsync for GeminiModel<'_> {
    type Response = String;

    #[instrument(level = "info", skip_all, fields(model = %self.model, prompt_len = text.len()))]
    async fn ask(&self, text: &str) -> Result<Self::Response, Box<dyn Error>> {
        let t0 = Instant::now();
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        );
        let request = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart { text: text.to_string() }],
            }],
        };

        debug!("Sending request to Gemini API");
        let res = self
            .client
            .post(&url)
            .header("x-goog-api-key", self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = res.status();
        debug!(status = %status, elapsed_ms = t0.elapsed().as_millis(), "Gemini API response received");

        if !status.is_success() {
            let error_body = res.text().await.unwrap_or_default();
            return Err(format!("Gemini API returned {}: {}", status, error_body).into());
        }

        let resp: GeminiResponse = res.json().await?;
        if let Some(error) = resp.error {
            return Err(format!("Gemini API Error: {}", error.message).into());
        }
        resp.text().ok_or_else(|| "No content returned from Gemini".into())
    }
}

/// Summarization front-end: model fallback chain plus retries.
///
/// Without an API key the summarizer is disabled and callers fall back to
/// the raw description.
#[derive(Debug, Clone)]
pub struct Summarizer {
    client: Client,
    settings: GeminiSettings,
}

impl Summarizer {
    pub fn new(client: Client, settings: GeminiSettings) -> Self {
        Self { client, settings }
    }

    pub fn is_enabled(&self) -> bool {
        self.settings.api_key.is_some()
    }

    /// Ask each model in `models` in turn and return the first answer.
    ///
    /// # Errors
    ///
    /// Fails when the summarizer is disabled, `models` is empty, or every
    /// model failed; the error carries the last model's failure.
    #[instrument(level = "info", skip_all, fields(models = ?models))]
    pub async fn summarize(&self, prompt: &str, models: &[String]) -> Result<String, Box<dyn Error>> {
        let Some(api_key) = self.settings.api_key.as_deref() else {
            return Err("Gemini API key not configured".into());
        };

        let t0 = Instant::now();
        let mut last_error: Box<dyn Error> = "no Gemini models configured".into();
        for model in models {
            let gemini = GeminiModel {
                client: &self.client,
                base_url: &self.settings.base_url,
                api_key,
                model,
            };
            let api = RetryAsk::new(
                gemini,
                self.settings.max_retries,
                StdDuration::from_millis(self.settings.base_delay_ms),
            );
            match api.ask(prompt).await {
                Ok(text) => {
                    info!(
                        %model,
                        elapsed_ms_total = t0.elapsed().as_millis(),
                        preview = %truncate_for_log(&text, 120),
                        "Summary generated"
                    );
                    return Ok(text);
                }
                Err(e) => {
                    warn!(%model, error = %e, "Model failed; trying next");
                    last_error = e;
                }
            }
        }
        error!(elapsed_ms_total = t0.elapsed().as_millis(), error = %last_error, "All models failed");
        Err(last_error)
    }
}
