//! Remote page access.
//!
//! The crawler only depends on [`PageSource`], so tests can serve pages from
//! memory. [`HttpPageSource`] is the real implementation.

use std::future::Future;
use std::time::Duration;

use crate::ScrapeError;
use crate::retry::{RetryPolicy, send_bytes};

/// Default base URL of the abandoned-airfields site.
pub const DEFAULT_BASE_URL: &str = "http://www.airfields-freeman.com/";

/// Something that can return the raw body of a page by URL.
pub trait PageSource: Send + Sync {
    /// Fetches the full body of `url`.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError`] if the page cannot be retrieved.
    fn fetch_page(&self, url: &str) -> impl Future<Output = Result<Vec<u8>, ScrapeError>> + Send;
}

/// Settings for [`HttpPageSource`].
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub user_agent: String,
    /// Per-attempt timeout.
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("airfield-recon/{}", env!("CARGO_PKG_VERSION")),
            timeout: Duration::from_secs(60),
            retry: RetryPolicy::default(),
        }
    }
}

/// Fetches pages over HTTP with retry and backoff.
#[derive(Debug, Clone)]
pub struct HttpPageSource {
    client: reqwest::Client,
    retry: RetryPolicy,
}

impl HttpPageSource {
    /// Builds a client from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::Http`] if the client cannot be constructed.
    pub fn new(config: &HttpConfig) -> Result<Self, ScrapeError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout)
            .build()?;
        Ok(Self {
            client,
            retry: config.retry,
        })
    }
}

impl PageSource for HttpPageSource {
    async fn fetch_page(&self, url: &str) -> Result<Vec<u8>, ScrapeError> {
        log::debug!("GET {url}");
        send_bytes(|| self.client.get(url), &self.retry).await
    }
}

/// Joins a base URL and a relative path with exactly one slash.
#[must_use]
pub fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_with_single_slash() {
        assert_eq!(
            join_url("http://example.com/", "/CA/Airfields_CA.htm"),
            "http://example.com/CA/Airfields_CA.htm"
        );
        assert_eq!(join_url("http://example.com", "x.htm"), "http://example.com/x.htm");
    }

    #[test]
    fn client_builds_from_defaults() {
        assert!(HttpPageSource::new(&HttpConfig::default()).is_ok());
    }
}
