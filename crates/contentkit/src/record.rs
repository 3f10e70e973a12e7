//! Assembly of the canonical output record

use crate::blocks::{render_markdown, ContentBlock};
use crate::error::ParseError;
use crate::types::{ContentType, OutputRecord};
use url::Url;

/// Per-document fields merged into an [`OutputRecord`]
#[derive(Debug, Clone, Default)]
pub struct RecordFields {
    pub title: Option<String>,
    pub author: Option<String>,
    pub content_type: ContentType,
}

/// Render blocks and merge them with metadata and caller identifiers
///
/// Fails with [`ParseError::EmptyDocument`] when nothing renders, so a record
/// never carries empty content.
pub fn build_record(
    blocks: &[ContentBlock],
    fields: RecordFields,
    source_url: Option<&Url>,
    user_id: &str,
) -> Result<OutputRecord, ParseError> {
    let content = render_markdown(blocks);
    if content.trim().is_empty() {
        return Err(ParseError::EmptyDocument);
    }
    Ok(OutputRecord {
        title: non_empty(fields.title),
        content,
        content_type: fields.content_type,
        source_url: source_url.map(|u| u.to_string()),
        author: non_empty(fields.author),
        user_id: user_id.to_string(),
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
