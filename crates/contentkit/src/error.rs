//! Error types for ContentKit

use crate::types::SourceKind;
use thiserror::Error;

/// Errors that can occur while fetching a page
#[derive(Debug, Error)]
pub enum FetchError {
    /// URL is missing
    #[error("Missing required parameter: url")]
    MissingUrl,

    /// URL has invalid scheme
    #[error("Invalid URL: must start with http:// or https://")]
    InvalidUrlScheme,

    /// URL could not be parsed or has no host
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// URL is blocked by prefix list
    #[error("Blocked URL: prefix not allowed")]
    BlockedUrl,

    /// Failed to build HTTP client
    #[error("Failed to create HTTP client")]
    ClientBuildError(#[source] reqwest::Error),

    /// Fetch did not complete within its deadline
    #[error("Request timed out")]
    Timeout,

    /// Failed to connect to server
    #[error("Failed to connect to server")]
    ConnectError(#[source] reqwest::Error),

    /// Server answered with a non-success status
    #[error("HTTP status {0}")]
    HttpStatus(u16),

    /// Response body is not a textual page
    #[error("Unsupported content type: {0}")]
    UnsupportedContent(String),

    /// Other request error
    #[error("Request failed: {0}")]
    RequestError(String),

    /// Fetcher-specific error
    #[error("Fetcher error: {0}")]
    FetcherError(String),
}

impl FetchError {
    /// Create an error from a reqwest error
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else if err.is_connect() {
            FetchError::ConnectError(err)
        } else {
            FetchError::RequestError(err.to_string())
        }
    }

    /// Returns true for transient failures worth another attempt
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Timeout | FetchError::ConnectError(_) => true,
            FetchError::HttpStatus(status) => *status == 429 || (500..=599).contains(status),
            _ => false,
        }
    }
}

/// Errors raised while structuring an already-fetched document
#[derive(Debug, Error)]
pub enum ParseError {
    /// Document handed to the wrong pipeline
    #[error("Expected {expected} document, got {found}")]
    KindMismatch {
        expected: SourceKind,
        found: SourceKind,
    },

    /// Nothing readable survived extraction
    #[error("Document has no extractable content")]
    EmptyDocument,

    /// PDF layout without any pages
    #[error("PDF layout contains no pages")]
    NoPages,

    /// PDF layout payload could not be decoded
    #[error("Invalid PDF layout")]
    InvalidLayout(#[source] serde_json::Error),
}

/// Error returned by the single-document entry points
#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            FetchError::MissingUrl.to_string(),
            "Missing required parameter: url"
        );
        assert_eq!(
            FetchError::InvalidUrlScheme.to_string(),
            "Invalid URL: must start with http:// or https://"
        );
        assert_eq!(
            FetchError::BlockedUrl.to_string(),
            "Blocked URL: prefix not allowed"
        );
        assert_eq!(FetchError::Timeout.to_string(), "Request timed out");
        assert_eq!(FetchError::HttpStatus(404).to_string(), "HTTP status 404");
        assert_eq!(
            ParseError::KindMismatch {
                expected: SourceKind::Html,
                found: SourceKind::Pdf
            }
            .to_string(),
            "Expected html document, got pdf"
        );
    }

    #[test]
    fn test_retryable() {
        assert!(FetchError::Timeout.is_retryable());
        assert!(FetchError::HttpStatus(503).is_retryable());
        assert!(FetchError::HttpStatus(429).is_retryable());
        assert!(!FetchError::HttpStatus(404).is_retryable());
        assert!(!FetchError::BlockedUrl.is_retryable());
    }

    #[test]
    fn test_normalize_error_is_transparent() {
        let err: NormalizeError = ParseError::EmptyDocument.into();
        assert_eq!(err.to_string(), "Document has no extractable content");
        let err: NormalizeError = FetchError::Timeout.into();
        assert!(matches!(err, NormalizeError::Fetch(FetchError::Timeout)));
    }
}
