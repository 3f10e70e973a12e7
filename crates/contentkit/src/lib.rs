//! ContentKit - content normalization and crawl engine
//!
//! Turns heterogeneous technical content (blog posts, Substack articles, PDF
//! books, index/listing pages) into one structured record format: title,
//! author, canonical Markdown body, content-type tag and source URL.
//!
//! ## Pipelines
//!
//! - HTML: [`strip_boilerplate`] → [`Structurer`] → [`extract_metadata`]
//! - PDF: [`PdfLoader`] → [`segment_pdf`]
//!
//! Both converge on a [`ContentBlock`] sequence that [`render_markdown`]
//! turns into the record body; [`classify`] assigns the content type.
//!
//! ## Fetcher System
//!
//! Fetching is the only I/O. The [`FetcherRegistry`] dispatches each URL to
//! the first matching [`PageFetcher`]; [`HttpFetcher`] is the built-in
//! catch-all and [`RetryingFetcher`] adds opt-in retries.
//!
//! ## Example
//!
//! ```no_run
//! # async fn run() -> Result<(), contentkit::NormalizeError> {
//! let ingestor = contentkit::Ingestor::builder().user_id("user-1").build();
//! let outcome = ingestor.ingest_url("https://example.com/blog").await?;
//! for record in &outcome.records {
//!     println!("{:?}", record.title);
//! }
//! # Ok(())
//! # }
//! ```

mod blocks;
mod classify;
pub mod client;
pub mod config;
mod crawl;
mod error;
pub mod fetchers;
mod html;
mod ingestor;
mod normalizer;
mod pdf;
mod record;
mod types;
mod urls;

pub use blocks::{render_markdown, ContentBlock};
pub use classify::{classify, ClassificationInput};
pub use client::{fetch_page, fetch_page_with_options, FetchOptions};
pub use config::ExtractionConfig;
pub use crawl::{
    crawl_index, discover_links, looks_like_index, CrawlOptions, CrawlState, DEFAULT_CONCURRENCY,
    MAX_CONCURRENCY,
};
pub use error::{FetchError, NormalizeError, ParseError};
pub use fetchers::{FetchedPage, FetcherRegistry, HttpFetcher, PageFetcher, RetryingFetcher};
pub use html::{
    extract_html, extract_metadata, strip_boilerplate, strip_site_suffix, Confidence,
    ExtractedMetadata, HtmlExtraction, MainContent, MetadataField, Structurer,
};
pub use ingestor::{Ingestor, IngestorBuilder};
pub use normalizer::Normalizer;
pub use pdf::{segment_pdf, Chapter, JsonLayoutLoader, PdfLoader, Segmentation, UNTITLED};
pub use record::{build_record, RecordFields};
pub use types::{
    ContentType, CrawlFailure, CrawlOutcome, KnowledgeBaseExport, OutputRecord, PdfLayout,
    PdfMetadata, PdfPage, PdfTextBlock, RawDocument, RawPayload, SourceKind,
};
pub use urls::{clean_input_url, normalize_url, same_site};

/// Default User-Agent string
pub const DEFAULT_USER_AGENT: &str = "Everruns ContentKit/1.0";
