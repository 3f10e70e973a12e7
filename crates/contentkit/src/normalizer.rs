//! Single-document normalization for HTML pages and PDF layouts
//!
//! Everything here is synchronous and pure over already-fetched input.

use crate::classify::{classify, ClassificationInput};
use crate::config::ExtractionConfig;
use crate::error::ParseError;
use crate::html::extract_html;
use crate::pdf::segment_pdf;
use crate::record::{build_record, RecordFields};
use crate::types::{OutputRecord, RawDocument, RawPayload, SourceKind};
use tracing::debug;
use url::Url;

/// Turns raw documents into output records
#[derive(Debug, Clone)]
pub struct Normalizer {
    config: ExtractionConfig,
    user_id: String,
}

impl Normalizer {
    pub fn new(config: ExtractionConfig, user_id: impl Into<String>) -> Self {
        Self {
            config,
            user_id: user_id.into(),
        }
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Normalize one HTML page into one record
    ///
    /// `source_url` overrides the document's own URL; it is also the base for
    /// resolving relative links.
    pub fn normalize_html(
        &self,
        document: &RawDocument,
        source_url: Option<&Url>,
    ) -> Result<OutputRecord, ParseError> {
        let RawPayload::Html(html) = document.payload() else {
            return Err(ParseError::KindMismatch {
                expected: SourceKind::Html,
                found: document.kind(),
            });
        };
        let source_url = source_url.or(document.source_url());

        let extraction = extract_html(html, &self.config, source_url);
        if extraction.fallback {
            debug!(url = source_url.map(Url::as_str), "Main content fell back to body");
        }
        let content_type = classify(
            &ClassificationInput {
                kind: SourceKind::Html,
                source_url,
                segmented: false,
            },
            &self.config,
        );

        build_record(
            &extraction.blocks,
            RecordFields {
                title: extraction.metadata.title().map(str::to_string),
                author: extraction.metadata.author().map(str::to_string),
                content_type,
            },
            source_url,
            &self.user_id,
        )
    }

    /// Normalize a PDF layout into one record per chapter
    pub fn normalize_pdf(&self, document: &RawDocument) -> Result<Vec<OutputRecord>, ParseError> {
        let RawPayload::Pdf(layout) = document.payload() else {
            return Err(ParseError::KindMismatch {
                expected: SourceKind::Pdf,
                found: document.kind(),
            });
        };
        let source_url = document.source_url();

        let segmentation = segment_pdf(layout, &self.config)?;
        let content_type = classify(
            &ClassificationInput {
                kind: SourceKind::Pdf,
                source_url,
                segmented: segmentation.is_segmented(),
            },
            &self.config,
        );
        debug!(
            chapters = segmentation.chapters.len(),
            boundaries = segmentation.boundaries,
            "Segmented PDF"
        );

        let author = layout.metadata.author.clone();
        segmentation
            .chapters
            .into_iter()
            .map(|chapter| {
                build_record(
                    &chapter.blocks,
                    RecordFields {
                        title: Some(chapter.title),
                        author: author.clone(),
                        content_type,
                    },
                    source_url,
                    &self.user_id,
                )
            })
            .collect()
    }
}
