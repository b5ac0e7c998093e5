//! Publisher API access with exponential backoff retry logic.
//!
//! The pipeline core assumes at most one attempt per external call. Retrying
//! is a harness decision, so it lives here as a decorator around the raw JSON
//! fetcher:
//! - [`FetchAsync`]: core trait for fetching one JSON document
//! - [`JsonFetcher`]: `reqwest` client carrying the publisher API key header
//! - [`RetryFetch`]: decorator adding retry with backoff to any `FetchAsync`
//!
//! # Retry Strategy
//!
//! - Exponential backoff starting at the configured base delay
//! - Maximum delay capped at 30 seconds
//! - Random jitter (0-250ms) added to each delay
//! - Client errors (4xx other than 429) are returned immediately

use std::fmt;
use std::time::{Duration as StdDuration, Instant};

use rand::{Rng, rng};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;
use tokio::time::sleep;
use tracing::{debug, error, instrument, warn};
use url::Url;

use crate::error::{NewscastError, Result};

/// Header the publisher expects its API key in.
pub const API_KEY_HEADER: &str = "x-mb-api-key";

/// Trait for fetching one JSON document.
pub trait FetchAsync {
    async fn fetch_json(&self, url: &Url) -> Result<Value>;
}

/// Plain `reqwest` fetcher. One request per call.
#[derive(Debug, Clone)]
pub struct JsonFetcher {
    client: reqwest::Client,
}

impl JsonFetcher {
    /// Build a client that sends `api_key` (when given) on every request.
    pub fn new(api_key: Option<&str>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        if let Some(key) = api_key {
            let value = HeaderValue::from_str(key)
                .map_err(|e| NewscastError::Config(format!("API key is not a valid header value: {e}")))?;
            headers.insert(HeaderName::from_static(API_KEY_HEADER), value);
        }
        let client = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(JsonFetcher { client })
    }
}

impl FetchAsync for JsonFetcher {
    #[instrument(level = "debug", skip_all, fields(%url))]
    async fn fetch_json(&self, url: &Url) -> Result<Value> {
        let t0 = Instant::now();
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            warn!(%url, status = status.as_u16(), "Request failed");
            return Err(NewscastError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        let value = response.json::<Value>().await?;
        debug!(%url, elapsed_ms = t0.elapsed().as_millis() as u64, "Fetched JSON");
        Ok(value)
    }
}

/// Wrapper that adds exponential backoff retry logic to any [`FetchAsync`] implementation.
///
/// The delay between retries follows:
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
/// ```
pub struct RetryFetch<T> {
    inner: T,
    max_retries: usize,
    base_delay: StdDuration,
    max_delay: StdDuration,
}

impl<T> RetryFetch<T>
where
    T: FetchAsync,
{
    /// Wrap `inner`. `max_retries = 0` means a single attempt.
    pub fn new(inner: T, max_retries: usize, base_delay: StdDuration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: StdDuration::from_secs(30),
        }
    }

    fn backoff(&self, attempt: usize) -> StdDuration {
        let shift = (attempt.saturating_sub(1)).min(16) as u32;
        let delay = self.base_delay.saturating_mul(1 << shift).min(self.max_delay);
        let jitter_ms: u64 = rng().random_range(0..=250);
        delay + StdDuration::from_millis(jitter_ms)
    }
}

impl<T> fmt::Debug for RetryFetch<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryFetch")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T> FetchAsync for RetryFetch<T>
where
    T: FetchAsync,
{
    #[instrument(level = "debug", skip_all, fields(%url))]
    async fn fetch_json(&self, url: &Url) -> Result<Value> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            match self.inner.fetch_json(url).await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    attempt += 1;
                    let total_dt = total_t0.elapsed();

                    if !e.is_retryable() || attempt > self.max_retries {
                        if attempt > 1 {
                            error!(
                                attempt,
                                max = self.max_retries,
                                elapsed_ms_total = total_dt.as_millis() as u64,
                                error = %e,
                                "fetch exhausted retries"
                            );
                        }
                        return Err(e);
                    }

                    let delay = self.backoff(attempt);
                    warn!(
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_total = total_dt.as_millis() as u64,
                        ?delay,
                        error = %e,
                        "fetch attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}
