//! Shared HTTP access for every data source.
//!
//! One [`reqwest::Client`] is built per run (connection pooling, default
//! user agent, request timeout). Google News rejects bare clients, so feed
//! requests go through [`Fetcher::get_as_browser`].

use crate::config::HttpSettings;
use reqwest::header::USER_AGENT;
use reqwest::{Client, Response};
use std::error::Error;
use std::time::Duration;
use tracing::{debug, instrument};

#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    browser_user_agent: String,
}

impl Fetcher {
    pub fn new(settings: &HttpSettings) -> Result<Self, Box<dyn Error>> {
        let client = Client::builder()
            .user_agent(settings.user_agent.clone())
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            browser_user_agent: settings.browser_user_agent.clone(),
        })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// GET `url`, optionally with a tighter timeout than the client default.
    ///
    /// The status is not checked; the scrapers decide what a failure means.
    #[instrument(level = "debug", skip(self))]
    pub async fn get(&self, url: &str, timeout: Option<Duration>) -> Result<Response, Box<dyn Error>> {
        let mut request = self.client.get(url);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }
        let response = request.send().await?;
        debug!(status = %response.status(), "Response received");
        Ok(response)
    }

    /// GET `url` as a desktop browser and return the body bytes of a successful response.
    #[instrument(level = "debug", skip(self))]
    pub async fn get_as_browser(&self, url: &str) -> Result<Vec<u8>, Box<dyn Error>> {
        let response = self
            .client
            .get(url)
            .header(USER_AGENT, &self.browser_user_agent)
            .send()
            .await?
            .error_for_status()?;
        let body = response.bytes().await?;
        debug!(bytes = body.len(), "Body received");
        Ok(body.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_get_as_browser_sends_browser_agent() {
        let server = MockServer::start().await;
        let settings = HttpSettings::default();
        Mock::given(method("GET"))
            .and(path("/rss"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<rss/>"))
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = Fetcher::new(&settings).unwrap();
        let body = fetcher.get_as_browser(&format!("{}/rss", server.uri())).await.unwrap();
        assert_eq!(body, b"<rss/>");

        // The browser agent contains commas, so compare the raw header value.
        let requests = server.received_requests().await.unwrap();
        let agent = requests[0].headers.get("user-agent").unwrap().to_str().unwrap();
        assert_eq!(agent, settings.browser_user_agent);
    }

    #[tokio::test]
    async fn test_get_as_browser_rejects_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let fetcher = Fetcher::new(&HttpSettings::default()).unwrap();
        assert!(fetcher.get_as_browser(&server.uri()).await.is_err());
    }

    #[tokio::test]
    async fn test_get_leaves_status_to_caller() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let fetcher = Fetcher::new(&HttpSettings::default()).unwrap();
        let response = fetcher.get(&server.uri(), Some(Duration::from_secs(2))).await.unwrap();
        assert_eq!(response.status().as_u16(), 404);
    }
}
