//! HTTP client for external job feeds.

use std::time::Duration;

use futures::stream::{self, StreamExt};
use reqwest::Client;

use crate::error::FeedError;

/// Per-URL fetch result.
///
/// A fetch never fails across this boundary: network errors, timeouts,
/// non-2xx statuses, and empty bodies all collapse into `success = false`
/// with a human-readable `error` string, so one bad feed never aborts a
/// sweep.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub url: String,
    pub success: bool,
    pub raw_body: Option<String>,
    pub error: Option<String>,
}

impl FetchResult {
    fn ok(url: String, body: String) -> Self {
        Self {
            url,
            success: true,
            raw_body: Some(body),
            error: None,
        }
    }

    fn err(url: String, error: String) -> Self {
        Self {
            url,
            success: false,
            raw_body: None,
            error: Some(error),
        }
    }
}

/// HTTP client for fetching raw feed bodies.
///
/// Owns its `reqwest::Client` with a fixed request timeout and a descriptive
/// `User-Agent`; constructed once and shared across sweeps.
pub struct FeedClient {
    client: Client,
    timeout_secs: u64,
}

impl FeedClient {
    /// Creates a `FeedClient` with the configured timeout and `User-Agent`.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed (e.g., invalid TLS config).
    pub fn new(timeout_secs: u64, user_agent: &str) -> Result<Self, FeedError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;
        Ok(Self {
            client,
            timeout_secs,
        })
    }

    /// Fetch one feed URL.
    ///
    /// Infallible by contract — see [`FetchResult`].
    pub async fn fetch(&self, url: &str) -> FetchResult {
        match self.try_fetch(url).await {
            Ok(body) => FetchResult::ok(url.to_string(), body),
            Err(reason) => {
                tracing::warn!(url, error = %reason, "feed fetch failed");
                FetchResult::err(url.to_string(), reason)
            }
        }
    }

    /// Fetch every URL fully in parallel.
    ///
    /// Each fetch is independent; results are collected in completion order,
    /// so callers must not rely on positions lining up with the input list.
    pub async fn fetch_all(&self, urls: &[String]) -> Vec<FetchResult> {
        stream::iter(urls.iter().cloned())
            .map(|url| async move { self.fetch(&url).await })
            .buffer_unordered(urls.len().max(1))
            .collect()
            .await
    }

    async fn try_fetch(&self, url: &str) -> Result<String, String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.describe(&e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("unexpected HTTP status {status} from {url}"));
        }

        let body = response.text().await.map_err(|e| self.describe(&e))?;
        if body.trim().is_empty() {
            return Err(format!("empty response body from {url}"));
        }

        Ok(body)
    }

    fn describe(&self, error: &reqwest::Error) -> String {
        if error.is_timeout() {
            format!("request timed out after {}s", self.timeout_secs)
        } else if error.is_connect() {
            format!("connection failed: {error}")
        } else {
            error.to_string()
        }
    }
}
