//! Page fetching entry points
//!
//! The fetch logic itself lives in the [`fetchers`](crate::fetchers) module;
//! these helpers clean the input URL and dispatch through the default registry.

use crate::error::FetchError;
use crate::fetchers::{FetchedPage, FetcherRegistry};
use crate::urls::clean_input_url;
use std::time::Duration;

/// Deadline for one page fetch
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(15);

/// Options applied to every page fetch
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Custom User-Agent
    pub user_agent: Option<String>,
    /// Allow list of URL prefixes
    pub allow_prefixes: Vec<String>,
    /// Block list of URL prefixes
    pub block_prefixes: Vec<String>,
    /// Deadline covering connect, headers and body
    pub timeout: Duration,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            user_agent: None,
            allow_prefixes: Vec::new(),
            block_prefixes: Vec::new(),
            timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }
}

/// Fetch a page with default options
///
/// For custom options, use [`fetch_page_with_options`].
pub async fn fetch_page(url: &str) -> Result<FetchedPage, FetchError> {
    fetch_page_with_options(url, FetchOptions::default()).await
}

/// Fetch a page with custom options
///
/// Uses the default fetcher registry. For custom fetchers, build a
/// [`FetcherRegistry`] directly.
pub async fn fetch_page_with_options(
    url: &str,
    options: FetchOptions,
) -> Result<FetchedPage, FetchError> {
    let url = clean_input_url(url)?;
    let registry = FetcherRegistry::with_defaults();
    registry.fetch(&url, &options).await
}
