//! URL cleanup and dedup keys

use crate::error::FetchError;
use url::Url;

/// Parse user-supplied URL text, defaulting to `https://` when no scheme is given
pub fn clean_input_url(input: &str) -> Result<Url, FetchError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(FetchError::MissingUrl);
    }

    let candidate = if input.contains("://") {
        input.to_string()
    } else {
        format!("https://{}", input.trim_start_matches('/'))
    };

    let url = Url::parse(&candidate).map_err(|e| FetchError::InvalidUrl(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(FetchError::InvalidUrlScheme);
    }
    match url.host_str() {
        Some(host) if !host.is_empty() => Ok(url),
        _ => Err(FetchError::InvalidUrl(format!("{} has no host", input))),
    }
}

/// Dedup key for a URL
///
/// Case-insensitive, ignores the scheme, fragment, default port and any
/// trailing slash, so `https://X.com/a/` and `http://x.com/A#top` collide.
pub fn normalize_url(url: &Url) -> String {
    let mut key = String::new();
    key.push_str(url.host_str().unwrap_or(""));
    if let Some(port) = url.port() {
        key.push(':');
        key.push_str(&port.to_string());
    }
    key.push_str(url.path().trim_end_matches('/'));
    if let Some(query) = url.query().filter(|q| !q.is_empty()) {
        key.push('?');
        key.push_str(query);
    }
    key.to_lowercase()
}

/// True when both URLs live on the same host, ignoring a `www.` prefix
pub fn same_site(a: &Url, b: &Url) -> bool {
    match (a.host_str(), b.host_str()) {
        (Some(x), Some(y)) => strip_www(x).eq_ignore_ascii_case(strip_www(y)),
        _ => false,
    }
}

fn strip_www(host: &str) -> &str {
    host.strip_prefix("www.").unwrap_or(host)
}
