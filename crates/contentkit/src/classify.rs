//! Content-type classification
//!
//! Decision order, first match wins:
//! 1. PDF that segmented into chapters → `book`
//! 2. host on a Substack domain → `substack`
//! 3. URL path or fragment carrying an interview/guide keyword → `interview_guide`
//! 4. host on a known blog platform, or any HTML page → `blog`
//! 5. otherwise → `other`

use crate::config::{host_matches, ExtractionConfig};
use crate::types::{ContentType, SourceKind};
use tracing::debug;
use url::Url;

/// Signals the classifier looks at
#[derive(Debug, Clone, Copy)]
pub struct ClassificationInput<'a> {
    pub kind: SourceKind,
    pub source_url: Option<&'a Url>,
    /// PDF segmentation found at least one chapter boundary
    pub segmented: bool,
}

/// Assign a content type; never fails, unmatched input is `Other`
pub fn classify(input: &ClassificationInput<'_>, config: &ExtractionConfig) -> ContentType {
    let host = input.source_url.and_then(Url::host_str);

    let content_type = if input.kind == SourceKind::Pdf && input.segmented {
        ContentType::Book
    } else if host.is_some_and(|h| any_host(h, &config.substack_hosts)) {
        ContentType::Substack
    } else if input
        .source_url
        .is_some_and(|url| has_guide_keyword(url, &config.guide_keywords))
    {
        ContentType::InterviewGuide
    } else if host.is_some_and(|h| any_host(h, &config.blog_hosts))
        || input.kind == SourceKind::Html
    {
        ContentType::Blog
    } else {
        ContentType::Other
    };

    debug!(
        kind = %input.kind,
        url = input.source_url.map(Url::as_str),
        content_type = %content_type,
        "Classified document"
    );
    content_type
}

fn any_host(host: &str, suffixes: &[String]) -> bool {
    suffixes.iter().any(|suffix| host_matches(host, suffix))
}

fn has_guide_keyword(url: &Url, keywords: &[String]) -> bool {
    let path = url.path().to_lowercase();
    let fragment = url.fragment().unwrap_or("").to_lowercase();
    keywords.iter().any(|keyword| {
        let keyword = keyword.to_lowercase();
        path.contains(&keyword) || fragment.contains(&keyword)
    })
}
