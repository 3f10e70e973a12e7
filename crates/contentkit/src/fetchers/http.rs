//! Plain HTTP fetcher
//!
//! Handles any HTTP/HTTPS URL and returns the served markup as-is. Pages that
//! need client-side rendering should be routed to a browser-backed
//! [`PageFetcher`] registered ahead of this one.

use crate::client::FetchOptions;
use crate::error::FetchError;
use crate::fetchers::{FetchedPage, PageFetcher};
use crate::DEFAULT_USER_AGENT;
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE, USER_AGENT};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Binary content type prefixes
const BINARY_PREFIXES: &[&str] = &[
    "image/",
    "audio/",
    "video/",
    "application/octet-stream",
    "application/pdf",
    "application/zip",
    "application/gzip",
    "application/x-tar",
    "application/x-rar",
    "application/x-7z",
    "application/vnd.ms-",
    "application/vnd.openxmlformats",
    "font/",
];

/// Connect timeout
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// HTTP fetcher
///
/// - Browser-like Accept header and configurable User-Agent
/// - Follows redirects and records the final URL
/// - Rejects binary content types
/// - Body read bounded by the fetch deadline; an expired deadline is a
///   failure, never a truncated page
pub struct HttpFetcher;

impl HttpFetcher {
    /// Create a new HTTP fetcher
    pub fn new() -> Self {
        Self
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    fn name(&self) -> &'static str {
        "http"
    }

    fn matches(&self, url: &Url) -> bool {
        matches!(url.scheme(), "http" | "https")
    }

    async fn fetch_page(
        &self,
        url: &Url,
        options: &FetchOptions,
    ) -> Result<FetchedPage, FetchError> {
        let mut headers = HeaderMap::new();
        let user_agent = options.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT);
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(user_agent)
                .unwrap_or_else(|_| HeaderValue::from_static(DEFAULT_USER_AGENT)),
        );
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_HTML));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(CONNECT_TIMEOUT.min(options.timeout))
            .build()
            .map_err(FetchError::ClientBuildError)?;

        let deadline = tokio::time::Instant::now() + options.timeout;
        let response = client
            .get(url.clone())
            .send()
            .await
            .map_err(FetchError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            debug!(url = %url, status = status.as_u16(), "Non-success status");
            return Err(FetchError::HttpStatus(status.as_u16()));
        }

        let final_url = response.url().clone();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        if let Some(ref ct) = content_type {
            if is_binary_content_type(ct) {
                return Err(FetchError::UnsupportedContent(ct.clone()));
            }
        }

        let body = read_body_until(response, deadline).await?;
        let html = String::from_utf8_lossy(&body).into_owned();

        Ok(FetchedPage {
            html,
            final_url,
            content_type,
        })
    }
}

/// Check if content type indicates binary content
fn is_binary_content_type(content_type: &str) -> bool {
    let ct_lower = content_type.to_lowercase();
    BINARY_PREFIXES
        .iter()
        .any(|prefix| ct_lower.starts_with(prefix))
}

/// Read the full response body, failing if the deadline passes first
async fn read_body_until(
    response: reqwest::Response,
    deadline: tokio::time::Instant,
) -> Result<Bytes, FetchError> {
    let mut body = Vec::new();
    let mut stream = response.bytes_stream();

    loop {
        let chunk_future = stream.next();
        let timeout_future = tokio::time::sleep_until(deadline);

        tokio::select! {
            chunk = chunk_future => {
                match chunk {
                    Some(Ok(bytes)) => body.extend_from_slice(&bytes),
                    Some(Err(e)) => return Err(FetchError::from_reqwest(e)),
                    None => return Ok(Bytes::from(body)),
                }
            }
            _ = timeout_future => {
                warn!(received = body.len(), "Body deadline reached, dropping partial page");
                return Err(FetchError::Timeout);
            }
        }
    }
}
