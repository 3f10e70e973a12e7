//! Fetcher system for retrieving rendered pages
//!
//! Design: Each fetcher handles specific URL patterns with custom logic.
//! FetcherRegistry dispatches to the first matching fetcher and enforces the
//! per-fetch deadline.

mod http;
mod retry;

pub use http::HttpFetcher;
pub use retry::RetryingFetcher;

use crate::client::FetchOptions;
use crate::error::FetchError;
use async_trait::async_trait;
use url::Url;

/// A fetched page ready for normalization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    /// Rendered HTML
    pub html: String,
    /// URL after redirects
    pub final_url: Url,
    /// Content-Type header value
    pub content_type: Option<String>,
}

/// Trait for page fetchers
///
/// Implement this trait to plug in a browser-rendering backend or a
/// site-specific fetcher. Each fetcher declares what URLs it can handle via
/// `matches()` and performs the actual fetch via `fetch_page()`.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Unique identifier for this fetcher (for logging/debugging)
    fn name(&self) -> &'static str;

    /// Returns true if this fetcher can handle the given URL
    ///
    /// More specific fetchers should be registered before generic ones.
    fn matches(&self, url: &Url) -> bool;

    /// Fetch the page at `url`
    ///
    /// Called only if `matches()` returned true.
    async fn fetch_page(&self, url: &Url, options: &FetchOptions)
        -> Result<FetchedPage, FetchError>;
}

/// Registry of fetchers that dispatches to the appropriate handler
///
/// Maintains an ordered list of fetchers. When fetching a URL, iterates
/// through fetchers and uses the first one that matches.
pub struct FetcherRegistry {
    fetchers: Vec<Box<dyn PageFetcher>>,
}

impl Default for FetcherRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FetcherRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            fetchers: Vec::new(),
        }
    }

    /// Create a registry with [`HttpFetcher`] registered as the catch-all
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(HttpFetcher::new()));
        registry
    }

    /// Register a fetcher
    ///
    /// Fetchers are checked in registration order, so register more
    /// specific fetchers before generic ones.
    pub fn register(&mut self, fetcher: Box<dyn PageFetcher>) {
        self.fetchers.push(fetcher);
    }

    /// Names of registered fetchers in dispatch order
    pub fn names(&self) -> Vec<&'static str> {
        self.fetchers.iter().map(|f| f.name()).collect()
    }

    /// Fetch a URL using the first matching fetcher
    ///
    /// The whole fetch is bounded by `options.timeout`; running past it
    /// yields [`FetchError::Timeout`].
    pub async fn fetch(&self, url: &Url, options: &FetchOptions) -> Result<FetchedPage, FetchError> {
        if !matches!(url.scheme(), "http" | "https") {
            return Err(FetchError::InvalidUrlScheme);
        }

        // Check allow/block lists before fetcher matching
        if !options.allow_prefixes.is_empty() {
            let allowed = options
                .allow_prefixes
                .iter()
                .any(|prefix| url.as_str().starts_with(prefix));
            if !allowed {
                return Err(FetchError::BlockedUrl);
            }
        }

        if options
            .block_prefixes
            .iter()
            .any(|prefix| url.as_str().starts_with(prefix))
        {
            return Err(FetchError::BlockedUrl);
        }

        let Some(fetcher) = self.fetchers.iter().find(|f| f.matches(url)) else {
            return Err(FetchError::FetcherError(
                "No fetcher available for URL".to_string(),
            ));
        };

        tracing::debug!(fetcher = fetcher.name(), url = %url, "Using fetcher");
        match tokio::time::timeout(options.timeout, fetcher.fetch_page(url, options)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(url = %url, timeout = ?options.timeout, "Fetch deadline exceeded");
                Err(FetchError::Timeout)
            }
        }
    }
}
