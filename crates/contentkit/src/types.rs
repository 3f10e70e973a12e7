//! Core types for ContentKit

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use url::Url;

/// Shape of a fetched source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Html,
    Pdf,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Html => write!(f, "html"),
            SourceKind::Pdf => write!(f, "pdf"),
        }
    }
}

/// One run of text on a PDF page with its dominant font size
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PdfTextBlock {
    /// Text of the block; lines are separated by `\n`
    pub text: String,
    /// Dominant font size in points
    pub font_size: f32,
}

impl PdfTextBlock {
    pub fn new(text: impl Into<String>, font_size: f32) -> Self {
        Self {
            text: text.into(),
            font_size,
        }
    }
}

/// Page-level text with layout hints, as produced by a PDF text extractor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PdfPage {
    /// 1-based page number
    pub number: u32,
    #[serde(default)]
    pub blocks: Vec<PdfTextBlock>,
}

/// Document information dictionary fields
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PdfMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

/// Ordered pages of a PDF plus its metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PdfLayout {
    #[serde(default)]
    pub metadata: PdfMetadata,
    pub pages: Vec<PdfPage>,
}

/// Raw payload of a fetched document
#[derive(Debug, Clone, PartialEq)]
pub enum RawPayload {
    /// Rendered HTML markup
    Html(String),
    /// Extracted PDF page text
    Pdf(PdfLayout),
}

/// A fetched source document, immutable once created
#[derive(Debug, Clone)]
pub struct RawDocument {
    payload: RawPayload,
    source_url: Option<Url>,
    captured_at: DateTime<Utc>,
}

impl RawDocument {
    /// Wrap rendered HTML
    pub fn html(html: impl Into<String>, source_url: Option<Url>) -> Self {
        Self {
            payload: RawPayload::Html(html.into()),
            source_url,
            captured_at: Utc::now(),
        }
    }

    /// Wrap extracted PDF layout
    pub fn pdf(layout: PdfLayout, source_url: Option<Url>) -> Self {
        Self {
            payload: RawPayload::Pdf(layout),
            source_url,
            captured_at: Utc::now(),
        }
    }

    pub fn kind(&self) -> SourceKind {
        match self.payload {
            RawPayload::Html(_) => SourceKind::Html,
            RawPayload::Pdf(_) => SourceKind::Pdf,
        }
    }

    pub fn payload(&self) -> &RawPayload {
        &self.payload
    }

    pub fn source_url(&self) -> Option<&Url> {
        self.source_url.as_ref()
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }
}

/// Genre tag attached to every output record
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Blog,
    Book,
    InterviewGuide,
    Substack,
    #[default]
    Other,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Blog => "blog",
            ContentType::Book => "book",
            ContentType::InterviewGuide => "interview_guide",
            ContentType::Substack => "substack",
            ContentType::Other => "other",
        }
    }
}

impl FromStr for ContentType {
    type Err = std::convert::Infallible;

    /// Unknown tags map to [`ContentType::Other`]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_lowercase().as_str() {
            "blog" => ContentType::Blog,
            "book" => ContentType::Book,
            "interview_guide" => ContentType::InterviewGuide,
            "substack" => ContentType::Substack,
            _ => ContentType::Other,
        })
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical record for one logical content unit (an article or a PDF chapter)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct OutputRecord {
    /// Document or chapter title
    pub title: Option<String>,
    /// Rendered Markdown body
    pub content: String,
    /// Genre classification
    pub content_type: ContentType,
    /// Where the content came from
    pub source_url: Option<String>,
    /// Author, when one could be determined
    pub author: Option<String>,
    /// Caller-supplied identifier, passed through untouched
    pub user_id: String,
}

/// Batch envelope handed to a knowledge base
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct KnowledgeBaseExport {
    pub team_id: String,
    pub items: Vec<OutputRecord>,
}

impl KnowledgeBaseExport {
    /// Team used when the caller does not name one
    pub const DEFAULT_TEAM: &'static str = "default";

    pub fn new(team_id: Option<&str>, items: Vec<OutputRecord>) -> Self {
        let team_id = team_id
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(Self::DEFAULT_TEAM);
        Self {
            team_id: team_id.to_string(),
            items,
        }
    }
}

/// A discovered link that could not be turned into a record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CrawlFailure {
    pub url: String,
    pub reason: String,
}

/// Result of crawling one index page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CrawlOutcome {
    /// Records in link-discovery order
    pub records: Vec<OutputRecord>,
    /// Links that failed, in link-discovery order
    pub failures: Vec<CrawlFailure>,
}

impl CrawlOutcome {
    pub fn failed_urls(&self) -> Vec<&str> {
        self.failures.iter().map(|f| f.url.as_str()).collect()
    }
}
