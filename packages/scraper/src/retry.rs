//! HTTP retry helpers for transient errors.
//!
//! Page fetches go through [`send_bytes`] rather than calling
//! `reqwest::RequestBuilder::send()` directly, so connection resets,
//! timeouts, rate limiting and server errors are retried with exponential
//! backoff. Client errors other than 429 are permanent.

use std::time::Duration;

use crate::ScrapeError;

/// How many times, and how patiently, to retry a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry; doubled for each further retry.
    pub base_delay: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based).
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32
            .checked_shl(attempt.saturating_sub(1))
            .unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Sends a request and returns the response body as raw bytes.
///
/// `build_request` is called once per attempt, since a builder is consumed
/// by `send()`.
///
/// # Errors
///
/// Returns [`ScrapeError`] if the request still fails after all retries,
/// the server returns a non-retryable status, or the body cannot be read.
#[allow(clippy::future_not_send)]
pub async fn send_bytes<F>(build_request: F, policy: &RetryPolicy) -> Result<Vec<u8>, ScrapeError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let mut attempt = 0;
    loop {
        let response = send_inner(&build_request, policy).await?;
        let url = response.url().to_string();

        match response.bytes().await {
            Ok(body) => return Ok(body.to_vec()),
            Err(e) if attempt < policy.max_retries => {
                attempt += 1;
                let delay = policy.delay_for(attempt);
                log::warn!(
                    "Body read failed for {url} (retry {attempt}/{}), re-fetching in {delay:?}: {e}",
                    policy.max_retries
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                log::error!("Body read failed for {url} after {attempt} retries: {e}");
                return Err(ScrapeError::Http(e));
            }
        }
    }
}

/// Core retry loop: returns the first 2xx/3xx response.
#[allow(clippy::future_not_send)]
async fn send_inner<F>(
    build_request: &F,
    policy: &RetryPolicy,
) -> Result<reqwest::Response, ScrapeError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let mut attempt = 0;
    loop {
        if attempt > 0 {
            let delay = policy.delay_for(attempt);
            log::warn!("  retry {attempt}/{} in {delay:?}...", policy.max_retries);
            tokio::time::sleep(delay).await;
        }
        let can_retry = attempt < policy.max_retries;
        attempt += 1;

        match build_request().send().await {
            Err(e) if is_transient(&e) && can_retry => {
                log::warn!("  transient error: {e}");
            }
            Err(e) => return Err(ScrapeError::Http(e)),
            Ok(response) => {
                let status = response.status();
                if is_retryable_status(status) && can_retry {
                    log::warn!("  HTTP {status} from {}", response.url());
                    continue;
                }
                if status.is_client_error() || status.is_server_error() {
                    return Err(ScrapeError::HttpStatus {
                        url: response.url().to_string(),
                        status: status.as_u16(),
                    });
                }
                return Ok(response);
            }
        }
    }
}

/// 429 and 5xx are worth another attempt.
fn is_retryable_status(status: reqwest::StatusCode) -> bool {
    status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Returns `true` if the error is likely transient and worth retrying.
fn is_transient(e: &reqwest::Error) -> bool {
    e.is_timeout() || e.is_connect() || e.is_body() || e.is_request()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            max_retries: 6,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(350),
        };
        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3), Duration::from_millis(350));
        assert_eq!(policy.delay_for(40), Duration::from_millis(350));
    }

    #[test]
    fn retryable_statuses() {
        assert!(is_retryable_status(reqwest::StatusCode::TOO_MANY_REQUESTS));
        assert!(is_retryable_status(reqwest::StatusCode::BAD_GATEWAY));
        assert!(!is_retryable_status(reqwest::StatusCode::NOT_FOUND));
        assert!(!is_retryable_status(reqwest::StatusCode::OK));
    }
}
