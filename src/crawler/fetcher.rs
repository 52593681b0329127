//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with proper user agent strings
//! - GET requests to fetch listing pages
//! - Retry with exponential backoff for transient failures
//! - Error classification

use crate::config::{Config, CrawlerConfig, UserAgentConfig};
use crate::crawler::error::FetchError;
use reqwest::{header::CONTENT_TYPE, Client};
use std::time::Duration;
use url::Url;

/// Upper bound for a single backoff delay
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Retry schedule for page fetches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts per URL, including the first one
    pub attempts: u32,

    /// Delay after the first failed attempt
    pub initial_backoff: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self {
            attempts: config.fetch_attempts.max(1),
            initial_backoff: Duration::from_millis(config.backoff_initial_ms),
        }
    }

    /// Delay before the attempt following failed attempt `attempt` (1-based)
    ///
    /// Doubles every time: `initial`, `2 * initial`, `4 * initial`, ...
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.initial_backoff
            .checked_mul(1u32 << exponent)
            .unwrap_or(MAX_BACKOFF)
            .min(MAX_BACKOFF)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&CrawlerConfig::default())
    }
}

/// Formats the User-Agent header: `CrawlerName/Version (+ContactURL; ContactEmail)`
pub fn user_agent_string(config: &UserAgentConfig) -> String {
    format!(
        "{}/{} (+{}; {})",
        config.crawler_name, config.crawler_version, config.contact_url, config.contact_email
    )
}

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```no_run
/// use book_harvest::config::load_config;
/// use book_harvest::crawler::build_http_client;
/// use std::path::Path;
///
/// let config = load_config(Path::new("harvest.toml")).unwrap();
/// let client = build_http_client(&config).unwrap();
/// ```
pub fn build_http_client(config: &Config) -> Result<Client, reqwest::Error> {
    let request_timeout = Duration::from_secs(config.crawler.request_timeout_secs);

    Client::builder()
        .user_agent(user_agent_string(&config.user_agent))
        .timeout(request_timeout)
        .connect_timeout(request_timeout.min(Duration::from_secs(10)))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Page fetcher: one URL in, HTML out
///
/// # Retry Logic
///
/// | Condition              | Action                                  |
/// |------------------------|-----------------------------------------|
/// | HTTP 2xx               | Return body                             |
/// | HTTP 4xx               | Immediate, non-transient `FetchError`   |
/// | HTTP 5xx               | Retry with backoff up to `attempts`     |
/// | Timeout                | Retry with backoff up to `attempts`     |
/// | Connection error       | Retry with backoff up to `attempts`     |
/// | Non-HTML Content-Type  | Immediate `FetchError::ContentMismatch` |
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    policy: RetryPolicy,
}

impl Fetcher {
    /// Creates a fetcher from the crawler configuration
    pub fn new(config: &Config) -> Result<Self, FetchError> {
        let client = build_http_client(config).map_err(|e| FetchError::Client(e.to_string()))?;
        Ok(Self::with_client(client, RetryPolicy::from_config(&config.crawler)))
    }

    /// Creates a fetcher around an existing client
    pub fn with_client(client: Client, policy: RetryPolicy) -> Self {
        Self { client, policy }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Fetches a page, retrying transient failures
    ///
    /// The returned error reports how many attempts were made.
    pub async fn fetch(&self, url: &Url) -> Result<String, FetchError> {
        let mut attempt = 0;

        loop {
            attempt += 1;
            tracing::debug!("Fetching {} (attempt {}/{})", url, attempt, self.policy.attempts);

            match self.fetch_once(url, attempt).await {
                Ok(body) => return Ok(body),
                Err(err) if err.is_transient() && attempt < self.policy.attempts => {
                    let delay = self.policy.backoff_for(attempt);
                    tracing::warn!(
                        "Attempt {}/{} for {} failed: {}; retrying in {:?}",
                        attempt,
                        self.policy.attempts,
                        url,
                        err,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => {
                    tracing::warn!("Giving up on {}: {}", url, err);
                    return Err(err);
                }
            }
        }
    }

    /// Performs a single GET request
    async fn fetch_once(&self, url: &Url, attempt: u32) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| classify_request_error(e, url, attempt))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
                attempts: attempt,
            });
        }

        // A missing Content-Type is tolerated; a non-HTML one is not
        if let Some(content_type) = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
        {
            if !content_type.to_ascii_lowercase().contains("html") {
                return Err(FetchError::ContentMismatch {
                    url: url.to_string(),
                    content_type: content_type.to_string(),
                });
            }
        }

        response
            .text()
            .await
            .map_err(|e| classify_request_error(e, url, attempt))
    }
}

/// Maps a transport-level error to a `FetchError`
fn classify_request_error(error: reqwest::Error, url: &Url, attempt: u32) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
            attempts: attempt,
        }
    } else {
        FetchError::Network {
            url: url.to_string(),
            attempts: attempt,
            message: error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_config() -> UserAgentConfig {
        UserAgentConfig {
            crawler_name: "TestCrawler".to_string(),
            crawler_version: "1.0".to_string(),
            contact_url: "https://example.com/about".to_string(),
            contact_email: "admin@example.com".to_string(),
        }
    }

    #[test]
    fn test_user_agent_format() {
        let ua = user_agent_string(&create_test_config());
        assert_eq!(
            ua,
            "TestCrawler/1.0 (+https://example.com/about; admin@example.com)"
        );
    }

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy {
            attempts: 4,
            initial_backoff: Duration::from_millis(500),
        };
        assert_eq!(policy.backoff_for(1), Duration::from_millis(500));
        assert_eq!(policy.backoff_for(2), Duration::from_millis(1000));
        assert_eq!(policy.backoff_for(3), Duration::from_millis(2000));
    }

    #[test]
    fn test_backoff_is_capped() {
        let policy = RetryPolicy {
            attempts: 10,
            initial_backoff: Duration::from_secs(10),
        };
        assert_eq!(policy.backoff_for(8), MAX_BACKOFF);
    }

    #[test]
    fn test_policy_from_config() {
        let config = CrawlerConfig {
            fetch_attempts: 5,
            backoff_initial_ms: 250,
            ..CrawlerConfig::default()
        };
        let policy = RetryPolicy::from_config(&config);
        assert_eq!(policy.attempts, 5);
        assert_eq!(policy.initial_backoff, Duration::from_millis(250));
    }
}
