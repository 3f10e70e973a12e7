//! Single-level index crawling
//!
//! An index page is fetched once, its content links are discovered in
//! document order and deduplicated against a per-crawl visited set, then each
//! link is fetched through a bounded worker pool. Fetch results land in slots
//! addressed by discovery position and are normalized walking those slots in
//! order, so neither the output order nor redirect dedup depends on which
//! fetch finishes first.

use crate::blocks::collapse_whitespace;
use crate::client::FetchOptions;
use crate::config::ExtractionConfig;
use crate::error::FetchError;
use crate::fetchers::{FetchedPage, FetcherRegistry};
use crate::html::is_boilerplate;
use crate::normalizer::Normalizer;
use crate::types::{CrawlFailure, CrawlOutcome, OutputRecord, RawDocument};
use crate::urls::{normalize_url, same_site};
use futures::stream::{FuturesUnordered, StreamExt};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::{HashMap, HashSet};
use std::sync::{LazyLock, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};
use url::Url;

/// Concurrent fetches when not configured
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Upper bound on concurrent fetches
pub const MAX_CONCURRENCY: usize = 8;

/// Per-fetch deadline during a crawl
pub const DEFAULT_CRAWL_TIMEOUT: Duration = Duration::from_secs(15);

/// Last path segments that mark a listing page
const INDEX_SEGMENTS: &[&str] = &[
    "blog", "archive", "archives", "posts", "articles", "writing", "essays", "news",
];

/// URL fragments used by single-page listing apps
const INDEX_FRAGMENTS: &[&str] = &["interview-guides", "companies"];

/// Path segments of taxonomy listings
const TAXONOMY_SEGMENTS: &[&str] = &["tag", "tags", "category", "categories", "author", "authors"];

/// Extensions of non-page resources
const ASSET_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "svg", "webp", "ico", "css", "js", "json", "xml", "rss",
    "atom", "zip", "gz", "tar", "rar", "7z", "mp3", "mp4", "webm", "woff", "woff2",
];

static PAGE_QUERY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|&)(?:page|paged|p)=\d+").unwrap());

static PAGE_PATH: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"/page/\d+/?$").unwrap());

static PAGER_TEXT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?i:(?:next|prev|previous|older|newer)(?:\s+(?:posts?|entries|page|articles))?|load\s+more|\d+)$",
    )
    .unwrap()
});

const PAGER_ARROWS: &str = "«»‹›←→<>";

/// Options for one crawl call
#[derive(Debug, Clone)]
pub struct CrawlOptions {
    /// Maximum concurrent fetches, clamped to `1..=MAX_CONCURRENCY`
    pub concurrency: usize,
    /// Per-fetch deadline; a fetch running past it is a per-link failure
    pub timeout: Duration,
    /// Dispatch at most this many links
    pub max_links: Option<usize>,
    /// Explicit path (or absolute URL) prefix overriding link-pattern inference
    pub include_prefix: Option<String>,
    /// Caller identifier copied onto every record
    pub user_id: String,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            timeout: DEFAULT_CRAWL_TIMEOUT,
            max_links: None,
            include_prefix: None,
            user_id: String::new(),
        }
    }
}

impl CrawlOptions {
    pub fn effective_concurrency(&self) -> usize {
        self.concurrency.clamp(1, MAX_CONCURRENCY)
    }
}

/// Visited-URL set for one crawl
///
/// Keys are [`normalize_url`] forms. `claim` checks and inserts under one
/// lock, so a URL can be claimed exactly once.
#[derive(Debug, Default)]
pub struct CrawlState {
    visited: Mutex<HashSet<String>>,
}

impl CrawlState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if `url` had not been claimed before
    pub fn claim(&self, url: &Url) -> bool {
        let key = normalize_url(url);
        self.visited
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key)
    }

    pub fn len(&self) -> usize {
        self.visited
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// True when the URL looks like a listing page rather than an article
pub fn looks_like_index(url: &Url) -> bool {
    if url
        .fragment()
        .is_some_and(|f| INDEX_FRAGMENTS.contains(&f.to_lowercase().as_str()))
    {
        return true;
    }
    let segments: Vec<String> = path_segments(url)
        .into_iter()
        .map(|s| s.to_lowercase())
        .collect();
    if segments
        .iter()
        .any(|s| s == "category" || s == "tag")
    {
        return true;
    }
    segments
        .last()
        .is_some_and(|last| INDEX_SEGMENTS.contains(&last.as_str()))
}

/// Content links on an index page, in document order
///
/// Navigation and page furniture, pagination, taxonomy pages, assets, other
/// hosts and the index itself are excluded. Duplicates are kept; dedup is
/// the crawl state's job.
pub fn discover_links(html: &str, index_url: &Url, include_prefix: Option<&str>) -> Vec<Url> {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };
    let index_key = normalize_url(index_url);

    let candidates: Vec<Url> = document
        .select(&selector)
        .filter(|anchor| !in_furniture(*anchor))
        .filter_map(|anchor| {
            let href = anchor.value().attr("href")?;
            let mut url = index_url.join(href.trim()).ok()?;
            url.set_fragment(None);
            let text = collapse_whitespace(&anchor.text().collect::<String>());
            is_content_candidate(&url, &text, index_url, &index_key).then_some(url)
        })
        .collect();

    let links = match include_prefix {
        Some(prefix) => candidates
            .into_iter()
            .filter(|url| matches_prefix(url, prefix))
            .collect(),
        None => infer_pattern(candidates, index_url),
    };
    debug!(index = %index_url, links = links.len(), "Discovered content links");
    links
}

fn in_furniture(anchor: ElementRef<'_>) -> bool {
    anchor
        .ancestors()
        .filter_map(ElementRef::wrap)
        .any(is_boilerplate)
}

fn is_content_candidate(url: &Url, text: &str, index_url: &Url, index_key: &str) -> bool {
    if !matches!(url.scheme(), "http" | "https") || !same_site(url, index_url) {
        return false;
    }
    if normalize_url(url) == index_key {
        return false;
    }
    let path = url.path().to_lowercase();
    let is_pagination = url.query().is_some_and(|q| PAGE_QUERY.is_match(q))
        || PAGE_PATH.is_match(&path)
        || is_pager_text(text);
    if is_pagination {
        return false;
    }
    let segments = path_segments(url);
    if segments
        .iter()
        .any(|s| TAXONOMY_SEGMENTS.contains(&s.to_lowercase().as_str()))
    {
        return false;
    }
    let is_asset = segments.last().is_some_and(|last| {
        let last = last.to_lowercase();
        last == "feed"
            || last == "rss"
            || last
                .rsplit_once('.')
                .is_some_and(|(_, ext)| ASSET_EXTENSIONS.contains(&ext))
    });
    !is_asset
}

fn is_pager_text(text: &str) -> bool {
    let words = text
        .trim_matches(|c: char| !c.is_alphanumeric() && c != ' ')
        .trim();
    if words.is_empty() {
        // Arrow-only anchors such as "»" or "←"
        return !text.is_empty() && text.chars().all(|c| PAGER_ARROWS.contains(c) || c == ' ');
    }
    PAGER_TEXT.is_match(words)
}

fn matches_prefix(url: &Url, prefix: &str) -> bool {
    if prefix.starts_with("http://") || prefix.starts_with("https://") {
        url.as_str().starts_with(prefix)
    } else {
        url.path().starts_with(prefix)
    }
}

/// Keep links sharing the index path prefix, else the most common first
/// segment, else everything
fn infer_pattern(candidates: Vec<Url>, index_url: &Url) -> Vec<Url> {
    let index_path = index_url.path().trim_end_matches('/');
    if !index_path.is_empty() {
        let prefix = format!("{}/", index_path);
        let under_index: Vec<Url> = candidates
            .iter()
            .filter(|url| url.path().len() > prefix.len() && url.path().starts_with(&prefix))
            .cloned()
            .collect();
        if !under_index.is_empty() {
            return under_index;
        }
    }

    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut first_seen: Vec<String> = Vec::new();
    for url in &candidates {
        let segments = path_segments(url);
        if segments.len() < 2 {
            continue;
        }
        let first = segments[0].to_string();
        let count = counts.entry(first.clone()).or_insert(0);
        if *count == 0 {
            first_seen.push(first);
        }
        *count += 1;
    }
    let common = first_seen
        .into_iter()
        .filter(|segment| counts.get(segment).is_some_and(|n| *n >= 2))
        .max_by(|a, b| counts[a].cmp(&counts[b]).then(std::cmp::Ordering::Greater));

    match common {
        Some(segment) => candidates
            .into_iter()
            .filter(|url| {
                let segments = path_segments(url);
                segments.len() >= 2 && segments[0] == segment
            })
            .collect(),
        None => candidates,
    }
}

fn path_segments(url: &Url) -> Vec<&str> {
    url.path_segments()
        .map(|segments| segments.filter(|s| !s.is_empty()).collect())
        .unwrap_or_default()
}

enum LinkOutcome {
    Record(OutputRecord),
    /// Redirected onto a page another link already claimed
    Duplicate,
    Failed(String),
}

/// Crawl an index page one level deep
///
/// Failing to fetch the index itself is an error; every later failure is
/// reported per link in [`CrawlOutcome::failures`].
pub async fn crawl_index(
    registry: &FetcherRegistry,
    config: &ExtractionConfig,
    fetch_options: &FetchOptions,
    index_url: &Url,
    options: &CrawlOptions,
) -> Result<CrawlOutcome, FetchError> {
    let fetch_options = FetchOptions {
        timeout: options.timeout,
        ..fetch_options.clone()
    };

    let index = registry.fetch(index_url, &fetch_options).await?;
    let state = CrawlState::new();
    state.claim(index_url);
    state.claim(&index.final_url);

    let discovered = discover_links(
        &index.html,
        &index.final_url,
        options.include_prefix.as_deref(),
    );
    let discovered_count = discovered.len();
    let mut links: Vec<Url> = discovered
        .into_iter()
        .filter(|url| state.claim(url))
        .collect();
    if let Some(max) = options.max_links {
        links.truncate(max);
    }
    debug!(
        index = %index_url,
        discovered = discovered_count,
        dispatched = links.len(),
        "Dispatching crawl"
    );

    let semaphore = Semaphore::new(options.effective_concurrency());
    let mut fetched: Vec<Option<Result<FetchedPage, FetchError>>> =
        (0..links.len()).map(|_| None).collect();

    let mut tasks = FuturesUnordered::new();
    for (position, url) in links.iter().enumerate() {
        let semaphore = &semaphore;
        let fetch_options = &fetch_options;
        tasks.push(async move {
            let result = match semaphore.acquire().await {
                Ok(_permit) => registry.fetch(url, fetch_options).await,
                Err(_) => Err(FetchError::FetcherError(
                    "Crawl worker pool closed".to_string(),
                )),
            };
            (position, result)
        });
    }
    while let Some((position, result)) = tasks.next().await {
        fetched[position] = Some(result);
    }

    // Redirect targets are claimed in discovery order, never completion order
    let normalizer = Normalizer::new(config.clone(), options.user_id.clone());
    let slots: Vec<Option<LinkOutcome>> = links
        .iter()
        .zip(fetched)
        .map(|(url, result)| result.map(|result| process_link(url, result, &state, &normalizer)))
        .collect();

    let mut outcome = CrawlOutcome::default();
    for (url, slot) in links.iter().zip(slots) {
        match slot {
            Some(LinkOutcome::Record(record)) => outcome.records.push(record),
            Some(LinkOutcome::Duplicate) => {}
            Some(LinkOutcome::Failed(reason)) => {
                warn!(url = %url, reason = %reason, "Crawl link failed");
                outcome.failures.push(CrawlFailure {
                    url: url.to_string(),
                    reason,
                });
            }
            None => outcome.failures.push(CrawlFailure {
                url: url.to_string(),
                reason: "Link was not processed".to_string(),
            }),
        }
    }

    info!(
        index = %index_url,
        records = outcome.records.len(),
        failures = outcome.failures.len(),
        "Crawl finished"
    );
    Ok(outcome)
}

fn process_link(
    url: &Url,
    fetched: Result<FetchedPage, FetchError>,
    state: &CrawlState,
    normalizer: &Normalizer,
) -> LinkOutcome {
    let page = match fetched {
        Ok(page) => page,
        Err(e) => return LinkOutcome::Failed(e.to_string()),
    };
    if normalize_url(&page.final_url) != normalize_url(url) && !state.claim(&page.final_url) {
        debug!(url = %url, final_url = %page.final_url, "Redirect target already crawled");
        return LinkOutcome::Duplicate;
    }
    let document = RawDocument::html(page.html, Some(page.final_url));
    match normalizer.normalize_html(&document, None) {
        Ok(record) => LinkOutcome::Record(record),
        Err(e) => LinkOutcome::Failed(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetchers::PageFetcher;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Serves an index at `/blog` and an article for every other path
    struct SiteFetcher {
        links: Vec<&'static str>,
        /// Paths answered as redirects to another path
        redirects: Vec<(&'static str, &'static str)>,
        /// Per-path response delay
        delays: Vec<(&'static str, Duration)>,
        default_delay: Duration,
        in_flight: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
    }

    impl SiteFetcher {
        fn new(links: Vec<&'static str>) -> Self {
            Self {
                links,
                redirects: Vec::new(),
                delays: Vec::new(),
                default_delay: Duration::ZERO,
                in_flight: Arc::new(AtomicUsize::new(0)),
                peak: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    #[async_trait]
    impl PageFetcher for SiteFetcher {
        fn name(&self) -> &'static str {
            "site"
        }

        fn matches(&self, url: &Url) -> bool {
            url.host_str() == Some("site.test")
        }

        async fn fetch_page(
            &self,
            url: &Url,
            _options: &FetchOptions,
        ) -> Result<FetchedPage, FetchError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);

            let path = url.path().to_string();
            let delay = self
                .delays
                .iter()
                .find(|(p, _)| *p == path)
                .map(|(_, d)| *d)
                .unwrap_or(self.default_delay);
            tokio::time::sleep(delay).await;

            let final_path = self
                .redirects
                .iter()
                .find(|(from, _)| *from == path)
                .map(|(_, to)| *to)
                .unwrap_or(path.as_str())
                .to_string();
            let html = if final_path == "/blog" {
                let anchors: String = self
                    .links
                    .iter()
                    .map(|href| format!(r#"<li><a href="{href}">Read {href}</a></li>"#))
                    .collect();
                format!("<html><body><main><ul>{anchors}</ul></main></body></html>")
            } else {
                format!(
                    "<html><head><title>Post {final_path}</title></head><body><article>\
                     <p>Body text served for {final_path}, long enough to count as content.</p>\
                     </article></body></html>"
                )
            };

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(FetchedPage {
                html,
                final_url: url.join(&final_path).unwrap(),
                content_type: Some("text/html".to_string()),
            })
        }
    }

    async fn crawl_site(fetcher: SiteFetcher, concurrency: usize) -> CrawlOutcome {
        let mut registry = FetcherRegistry::new();
        registry.register(Box::new(fetcher));
        let options = CrawlOptions {
            concurrency,
            ..Default::default()
        };
        crawl_index(
            &registry,
            &ExtractionConfig::default(),
            &FetchOptions::default(),
            &url("https://site.test/blog"),
            &options,
        )
        .await
        .unwrap()
    }

    fn titles(outcome: &CrawlOutcome) -> Vec<String> {
        outcome
            .records
            .iter()
            .map(|r| r.title.clone().unwrap_or_default())
            .collect()
    }

    #[tokio::test]
    async fn test_redirect_dedup_follows_discovery_order() {
        let mut results = Vec::new();
        for slow in ["/blog/a", "/blog/b"] {
            let mut fetcher = SiteFetcher::new(vec!["/blog/x", "/blog/a", "/blog/b", "/blog/y"]);
            fetcher.redirects = vec![("/blog/a", "/blog/c"), ("/blog/b", "/blog/c")];
            fetcher.delays = vec![(slow, Duration::from_millis(80))];
            let outcome = crawl_site(fetcher, 4).await;
            assert!(outcome.failures.is_empty());
            results.push(titles(&outcome));
        }
        let expected = vec!["Post /blog/x", "Post /blog/c", "Post /blog/y"];
        assert_eq!(results[0], expected);
        assert_eq!(results[1], expected);
    }

    #[tokio::test]
    async fn test_in_flight_fetches_stay_within_cap() {
        let links: Vec<&'static str> = vec![
            "/blog/p1", "/blog/p2", "/blog/p3", "/blog/p4", "/blog/p5", "/blog/p6", "/blog/p7",
            "/blog/p8", "/blog/p9", "/blog/p10",
        ];
        let mut fetcher = SiteFetcher::new(links);
        fetcher.default_delay = Duration::from_millis(15);
        let peak = Arc::clone(&fetcher.peak);

        let outcome = crawl_site(fetcher, 2).await;

        assert_eq!(outcome.records.len(), 10);
        let peak = peak.load(Ordering::SeqCst);
        assert!(peak <= 2, "peak in-flight fetches was {}", peak);
        assert!(peak >= 1);
    }

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    fn strings(urls: Vec<Url>) -> Vec<String> {
        urls.into_iter().map(|u| u.to_string()).collect()
    }

    const BLOG_INDEX: &str = r#"<html><body>
      <nav><a href="/blog/">Blog</a> <a href="/blog/nav-post">Nav post</a></nav>
      <main>
        <a href="/blog/first-post">First</a>
        <a href="https://example.com/blog/second-post#comments">Second</a>
        <a href="/blog/first-post/">First again</a>
        <a href="/blog/tag/rust">Rust</a>
        <a href="/blog/page/2">2</a>
        <a href="/blog?page=2">Next »</a>
        <a href="/blog/feed.xml">RSS</a>
        <a href="https://other.com/blog/x">Elsewhere</a>
        <a href="/about">About</a>
        <a href="/blog/third-post">Third</a>
      </main>
      <footer><a href="/blog/footer-post">Footer post</a></footer>
    </body></html>"#;

    #[test]
    fn test_discover_links_filters_and_keeps_order() {
        let links = discover_links(BLOG_INDEX, &url("https://example.com/blog"), None);
        assert_eq!(
            strings(links),
            vec![
                "https://example.com/blog/first-post",
                "https://example.com/blog/second-post",
                "https://example.com/blog/first-post/",
                "https://example.com/blog/third-post",
            ]
        );
    }

    #[test]
    fn test_most_common_segment_on_root_index() {
        let html = r#"<html><body><div>
          <a href="/posts/a">A</a> <a href="/docs/x">X</a>
          <a href="/posts/b">B</a> <a href="/contact">Contact</a>
        </div></body></html>"#;
        let index = url("https://example.com/");
        assert_eq!(
            strings(discover_links(html, &index, None)),
            vec!["https://example.com/posts/a", "https://example.com/posts/b"]
        );
        assert_eq!(
            strings(discover_links(html, &index, Some("/docs"))),
            vec!["https://example.com/docs/x"]
        );
    }

    #[test]
    fn test_flat_site_keeps_all_links() {
        let html = r#"<html><body><div>
          <a href="/a-post">A</a> <a href="/b-post">B</a>
        </div></body></html>"#;
        assert_eq!(
            discover_links(html, &url("https://example.com/"), None).len(),
            2
        );
    }

    #[test]
    fn test_pager_text() {
        assert!(is_pager_text("Next »"));
        assert!(is_pager_text("Older posts"));
        assert!(is_pager_text("3"));
        assert!(is_pager_text("»"));
        assert!(!is_pager_text(""));
        assert!(!is_pager_text("Next steps for async Rust"));
    }

    #[test]
    fn test_looks_like_index() {
        assert!(looks_like_index(&url("https://example.com/blog")));
        assert!(looks_like_index(&url("https://example.com/blog/")));
        assert!(looks_like_index(&url("https://x.substack.com/archive")));
        assert!(looks_like_index(&url("https://example.com/category/rust")));
        assert!(looks_like_index(&url("https://example.com/#interview-guides")));
        assert!(!looks_like_index(&url("https://example.com/blog/my-post")));
        assert!(!looks_like_index(&url("https://example.com/")));
    }

    #[test]
    fn test_crawl_state_claims_once() {
        let state = CrawlState::new();
        assert!(state.is_empty());
        assert!(state.claim(&url("https://example.com/a")));
        assert!(!state.claim(&url("https://EXAMPLE.com/a/")));
        assert!(!state.claim(&url("http://example.com/a#x")));
        assert!(state.claim(&url("https://example.com/b")));
        assert_eq!(state.len(), 2);
    }

    #[test]
    fn test_concurrency_is_clamped() {
        let mut options = CrawlOptions::default();
        assert_eq!(options.effective_concurrency(), DEFAULT_CONCURRENCY);
        options.concurrency = 0;
        assert_eq!(options.effective_concurrency(), 1);
        options.concurrency = 64;
        assert_eq!(options.effective_concurrency(), MAX_CONCURRENCY);
    }
}
