//! Opt-in retry wrapper for any fetcher

use crate::client::FetchOptions;
use crate::error::FetchError;
use crate::fetchers::{FetchedPage, PageFetcher};
use async_trait::async_trait;
use std::time::Duration;
use tracing::warn;
use url::Url;

/// Default delay before the first retry
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(250);

/// Retries transient failures of the wrapped fetcher with exponential backoff
///
/// Only timeouts, connect failures, 429 and 5xx responses are retried.
pub struct RetryingFetcher<F> {
    inner: F,
    max_retries: u32,
    base_delay: Duration,
}

impl<F: PageFetcher> RetryingFetcher<F> {
    pub fn new(inner: F, max_retries: u32) -> Self {
        Self {
            inner,
            max_retries,
            base_delay: DEFAULT_RETRY_DELAY,
        }
    }

    /// Delay before the first retry; doubles on each further attempt
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }
}

#[async_trait]
impl<F: PageFetcher> PageFetcher for RetryingFetcher<F> {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn matches(&self, url: &Url) -> bool {
        self.inner.matches(url)
    }

    async fn fetch_page(
        &self,
        url: &Url,
        options: &FetchOptions,
    ) -> Result<FetchedPage, FetchError> {
        let mut attempt = 0u32;
        loop {
            match self.inner.fetch_page(url, options).await {
                Err(e) if attempt < self.max_retries && e.is_retryable() => {
                    let delay = self.base_delay.saturating_mul(2u32.saturating_pow(attempt));
                    attempt += 1;
                    warn!(url = %url, attempt, error = %e, ?delay, "Retrying fetch");
                    tokio::time::sleep(delay).await;
                }
                result => return result,
            }
        }
    }
}
