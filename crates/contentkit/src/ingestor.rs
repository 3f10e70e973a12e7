//! Ingestor builder and entry points

use crate::client::FetchOptions;
use crate::config::ExtractionConfig;
use crate::crawl::{self, looks_like_index, CrawlOptions};
use crate::error::{FetchError, NormalizeError, ParseError};
use crate::fetchers::{FetcherRegistry, HttpFetcher, PageFetcher, RetryingFetcher};
use crate::normalizer::Normalizer;
use crate::pdf::{JsonLayoutLoader, PdfLoader};
use crate::types::{CrawlOutcome, OutputRecord, RawDocument};
use crate::urls::clean_input_url;
use schemars::schema_for;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Builder for configuring an [`Ingestor`]
pub struct IngestorBuilder {
    config: ExtractionConfig,
    fetch_options: FetchOptions,
    crawl_options: CrawlOptions,
    /// Retries for the built-in HTTP fetcher; zero disables the wrapper
    retries: u32,
    /// Fetchers tried before the built-in HTTP fetcher
    fetchers: Vec<Box<dyn PageFetcher>>,
    pdf_loader: Box<dyn PdfLoader>,
}

impl Default for IngestorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl IngestorBuilder {
    pub fn new() -> Self {
        let crawl_options = CrawlOptions::default();
        Self {
            config: ExtractionConfig::default(),
            fetch_options: FetchOptions {
                timeout: crawl_options.timeout,
                ..Default::default()
            },
            crawl_options,
            retries: 0,
            fetchers: Vec::new(),
            pdf_loader: Box::new(JsonLayoutLoader),
        }
    }

    /// Replace the extraction thresholds
    pub fn config(mut self, config: ExtractionConfig) -> Self {
        self.config = config;
        self
    }

    /// Caller identifier copied onto every record
    pub fn user_id(mut self, user_id: impl Into<String>) -> Self {
        self.crawl_options.user_id = user_id.into();
        self
    }

    /// Set custom User-Agent
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.fetch_options.user_agent = Some(ua.into());
        self
    }

    /// Add URL prefix to allow list
    pub fn allow_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.fetch_options.allow_prefixes.push(prefix.into());
        self
    }

    /// Add URL prefix to block list
    pub fn block_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.fetch_options.block_prefixes.push(prefix.into());
        self
    }

    /// Per-fetch deadline
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.fetch_options.timeout = timeout;
        self.crawl_options.timeout = timeout;
        self
    }

    /// Maximum concurrent fetches during a crawl
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.crawl_options.concurrency = concurrency;
        self
    }

    /// Dispatch at most `max` links per crawl
    pub fn max_links(mut self, max: usize) -> Self {
        self.crawl_options.max_links = Some(max);
        self
    }

    /// Only crawl links under this path or URL prefix
    pub fn include_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.crawl_options.include_prefix = Some(prefix.into());
        self
    }

    /// Retry transient HTTP failures up to `retries` times
    pub fn retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Register a fetcher ahead of the built-in HTTP fetcher
    pub fn fetcher(mut self, fetcher: Box<dyn PageFetcher>) -> Self {
        self.fetchers.push(fetcher);
        self
    }

    /// Replace the PDF layout loader
    pub fn pdf_loader(mut self, loader: Box<dyn PdfLoader>) -> Self {
        self.pdf_loader = loader;
        self
    }

    /// Build the ingestor
    pub fn build(self) -> Ingestor {
        let mut registry = FetcherRegistry::new();
        for fetcher in self.fetchers {
            registry.register(fetcher);
        }
        if self.retries > 0 {
            registry.register(Box::new(RetryingFetcher::new(
                HttpFetcher::new(),
                self.retries,
            )));
        } else {
            registry.register(Box::new(HttpFetcher::new()));
        }

        Ingestor {
            registry,
            config: self.config,
            fetch_options: self.fetch_options,
            crawl_options: self.crawl_options,
            pdf_loader: self.pdf_loader,
        }
    }
}

/// Configured fetch-and-normalize pipeline
pub struct Ingestor {
    registry: FetcherRegistry,
    config: ExtractionConfig,
    fetch_options: FetchOptions,
    crawl_options: CrawlOptions,
    pdf_loader: Box<dyn PdfLoader>,
}

impl Default for Ingestor {
    fn default() -> Self {
        IngestorBuilder::new().build()
    }
}

impl Ingestor {
    /// Create a new ingestor builder
    pub fn builder() -> IngestorBuilder {
        IngestorBuilder::new()
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    pub fn crawl_options(&self) -> &CrawlOptions {
        &self.crawl_options
    }

    pub fn fetch_options(&self) -> &FetchOptions {
        &self.fetch_options
    }

    fn normalizer(&self) -> Normalizer {
        Normalizer::new(self.config.clone(), self.crawl_options.user_id.clone())
    }

    /// Get output record schema as JSON
    pub fn output_schema(&self) -> serde_json::Value {
        let schema = schema_for!(OutputRecord);
        serde_json::to_value(schema).unwrap_or_default()
    }

    /// Normalize an already-fetched HTML document
    pub fn normalize_html(
        &self,
        document: &RawDocument,
        source_url: Option<&Url>,
    ) -> Result<OutputRecord, ParseError> {
        self.normalizer().normalize_html(document, source_url)
    }

    /// Normalize an already-loaded PDF layout, one record per chapter
    pub fn normalize_pdf(&self, document: &RawDocument) -> Result<Vec<OutputRecord>, ParseError> {
        self.normalizer().normalize_pdf(document)
    }

    /// Decode PDF input with the configured loader and normalize it
    pub fn normalize_pdf_bytes(
        &self,
        bytes: &[u8],
        source_url: Option<Url>,
    ) -> Result<Vec<OutputRecord>, ParseError> {
        let layout = self.pdf_loader.load(bytes)?;
        self.normalize_pdf(&RawDocument::pdf(layout, source_url))
    }

    /// Fetch one page and normalize it
    pub async fn normalize_url(&self, url: &str) -> Result<OutputRecord, NormalizeError> {
        let url = clean_input_url(url)?;
        let page = self.registry.fetch(&url, &self.fetch_options).await?;
        let document = RawDocument::html(page.html, Some(page.final_url));
        Ok(self.normalizer().normalize_html(&document, None)?)
    }

    /// Crawl an index page and normalize every discovered content link
    pub async fn crawl_index(&self, index_url: &str) -> Result<CrawlOutcome, FetchError> {
        let url = clean_input_url(index_url)?;
        crawl::crawl_index(
            &self.registry,
            &self.config,
            &self.fetch_options,
            &url,
            &self.crawl_options,
        )
        .await
    }

    /// Normalize a URL, crawling it first when it looks like an index page
    pub async fn ingest_url(&self, url: &str) -> Result<CrawlOutcome, NormalizeError> {
        let parsed = clean_input_url(url)?;
        if looks_like_index(&parsed) {
            debug!(url = %parsed, "Treating URL as index page");
            return Ok(self.crawl_index(parsed.as_str()).await?);
        }
        let record = self.normalize_url(parsed.as_str()).await?;
        Ok(CrawlOutcome {
            records: vec![record],
            failures: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetchers::FetchedPage;
    use crate::types::ContentType;
    use async_trait::async_trait;

    struct FixtureFetcher;

    #[async_trait]
    impl PageFetcher for FixtureFetcher {
        fn name(&self) -> &'static str {
            "fixture"
        }

        fn matches(&self, url: &Url) -> bool {
            url.host_str() == Some("fixture.test")
        }

        async fn fetch_page(
            &self,
            url: &Url,
            _options: &FetchOptions,
        ) -> Result<FetchedPage, FetchError> {
            let html = match url.path() {
                "/blog" => r#"<html><body><main>
                    <a href="/blog/one">One</a> <a href="/blog/two">Two</a>
                  </main></body></html>"#
                    .to_string(),
                path => format!(
                    "<html><head><title>Post {path}</title></head><body><article>\
                     <p>Some body text for the fixture page at {path}, long enough to count.</p>\
                     </article></body></html>"
                ),
            };
            Ok(FetchedPage {
                html,
                final_url: url.clone(),
                content_type: Some("text/html".to_string()),
            })
        }
    }

    fn ingestor() -> Ingestor {
        Ingestor::builder()
            .user_id("u-42")
            .fetcher(Box::new(FixtureFetcher))
            .build()
    }

    #[test]
    fn test_builder_defaults() {
        let ingestor = Ingestor::default();
        assert_eq!(ingestor.crawl_options().concurrency, crate::crawl::DEFAULT_CONCURRENCY);
        assert_eq!(ingestor.fetch_options().timeout, ingestor.crawl_options().timeout);
        assert_eq!(ingestor.registry.names(), vec!["http"]);
    }

    #[test]
    fn test_builder_options() {
        let ingestor = Ingestor::builder()
            .user_id("u")
            .user_agent("Bot/1.0")
            .timeout(Duration::from_secs(3))
            .concurrency(6)
            .max_links(10)
            .include_prefix("/posts/")
            .block_prefix("https://ads.")
            .retries(2)
            .fetcher(Box::new(FixtureFetcher))
            .build();
        assert_eq!(ingestor.fetch_options().user_agent.as_deref(), Some("Bot/1.0"));
        assert_eq!(ingestor.crawl_options().timeout, Duration::from_secs(3));
        assert_eq!(ingestor.crawl_options().max_links, Some(10));
        assert_eq!(ingestor.registry.names(), vec!["fixture", "http"]);
    }

    #[test]
    fn test_output_schema() {
        let schema = Ingestor::default().output_schema();
        let props = schema["properties"].as_object().unwrap();
        for key in ["title", "content", "content_type", "source_url", "author", "user_id"] {
            assert!(props.contains_key(key), "missing {}", key);
        }
    }

    #[test]
    fn test_normalize_pdf_bytes() {
        let json = br#"{"metadata": {"author": "Lee Park"},
            "pages": [{"number": 1, "blocks": [{"text": "A single page of notes.", "font_size": 10}]}]}"#;
        let records = ingestor().normalize_pdf_bytes(json, None).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].author.as_deref(), Some("Lee Park"));
        assert_eq!(records[0].user_id, "u-42");
    }

    #[tokio::test]
    async fn test_ingest_url_dispatches_index_pages() {
        let outcome = ingestor().ingest_url("fixture.test/blog").await.unwrap();
        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.records[0].title.as_deref(), Some("Post /blog/one"));
        assert_eq!(outcome.records[1].title.as_deref(), Some("Post /blog/two"));
        assert!(outcome.failures.is_empty());
    }

    #[tokio::test]
    async fn test_ingest_url_single_page() {
        let outcome = ingestor()
            .ingest_url("https://fixture.test/notes/one")
            .await
            .unwrap();
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records[0].content_type, ContentType::Blog);
        assert_eq!(
            outcome.records[0].source_url.as_deref(),
            Some("https://fixture.test/notes/one")
        );
    }

    #[tokio::test]
    async fn test_normalize_url_rejects_bad_input() {
        let result = ingestor().normalize_url("").await;
        assert!(matches!(
            result,
            Err(NormalizeError::Fetch(FetchError::MissingUrl))
        ));
    }
}
