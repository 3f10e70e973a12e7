//! Title and author extraction with ranked fallbacks
//!
//! Runs over the full document because titles and bylines usually live
//! outside the main-content region.
//!
//! Title: structured data (JSON-LD headline, `og:title`) → `<title>` minus the
//! site-name suffix → first level-1 heading.
//! Author: structured data → byline (`rel=author`, `.byline` elements, or a
//! `by <Name>` line near the top) → author meta tags.

use crate::blocks::{collapse_whitespace, ContentBlock};
use crate::config::ExtractionConfig;
use regex::Regex;
use scraper::{Html, Selector};
use serde_json::Value;
use std::sync::LazyLock;

static TITLE_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+[\-–—]\s+|\s*\|\s*").unwrap());

static BYLINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?i:(?:written|posted)\s+)?(?i:by)\s+(\p{Lu}[\p{L}'.\-]*(?:\s+\p{Lu}[\p{L}'.\-]*){0,3})")
        .unwrap()
});

static BY_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?i:(?:written|posted)\s+)?(?i:by)[:\s]+").unwrap());

const BYLINE_SELECTORS: &str =
    r#"[rel="author"], [itemprop="author"], .byline, .author, .author-name, .post-author"#;

const AUTHOR_META_SELECTORS: &[&str] = &[
    r#"meta[name="author"]"#,
    r#"meta[property="article:author"]"#,
    r#"meta[property="og:author"]"#,
];

/// Longest string accepted as an author name
const MAX_AUTHOR_CHARS: usize = 80;

/// Where a metadata value came from, ordered from weakest to strongest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Confidence {
    MetaTag,
    Heading,
    Byline,
    TitleTag,
    StructuredData,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataField {
    pub value: String,
    pub confidence: Confidence,
}

impl MetadataField {
    fn new(value: String, confidence: Confidence) -> Self {
        Self { value, confidence }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedMetadata {
    pub title: Option<MetadataField>,
    pub author: Option<MetadataField>,
}

impl ExtractedMetadata {
    pub fn title(&self) -> Option<&str> {
        self.title.as_ref().map(|f| f.value.as_str())
    }

    pub fn author(&self) -> Option<&str> {
        self.author.as_ref().map(|f| f.value.as_str())
    }
}

/// Extract title and author from the full document
///
/// `blocks` is the structured main content, used for the heading and byline
/// fallbacks.
pub fn extract_metadata(
    document: &Html,
    blocks: &[ContentBlock],
    config: &ExtractionConfig,
) -> ExtractedMetadata {
    let structured = structured_data(document);

    let title = structured
        .iter()
        .find_map(json_ld_title)
        .or_else(|| meta_content(document, r#"meta[property="og:title"]"#))
        .map(|t| MetadataField::new(t, Confidence::StructuredData))
        .or_else(|| title_tag(document).map(|t| MetadataField::new(t, Confidence::TitleTag)))
        .or_else(|| {
            first_h1(blocks, document).map(|t| MetadataField::new(t, Confidence::Heading))
        });

    let author = structured
        .iter()
        .find_map(json_ld_author)
        .map(|a| MetadataField::new(a, Confidence::StructuredData))
        .or_else(|| {
            byline(document, blocks, config).map(|a| MetadataField::new(a, Confidence::Byline))
        })
        .or_else(|| meta_author(document).map(|a| MetadataField::new(a, Confidence::MetaTag)));

    ExtractedMetadata { title, author }
}

/// Parsed JSON-LD objects, with `@graph` members flattened
fn structured_data(document: &Html) -> Vec<Value> {
    let Ok(selector) = Selector::parse(r#"script[type="application/ld+json"]"#) else {
        return Vec::new();
    };
    let mut objects = Vec::new();
    for script in document.select(&selector) {
        let raw: String = script.text().collect();
        let Ok(value) = serde_json::from_str::<Value>(raw.trim()) else {
            continue;
        };
        flatten_json_ld(value, &mut objects);
    }
    objects
}

fn flatten_json_ld(value: Value, out: &mut Vec<Value>) {
    match value {
        Value::Array(items) => items.into_iter().for_each(|v| flatten_json_ld(v, out)),
        Value::Object(mut map) => {
            if let Some(graph) = map.remove("@graph") {
                flatten_json_ld(graph, out);
            }
            out.push(Value::Object(map));
        }
        _ => {}
    }
}

fn json_ld_title(object: &Value) -> Option<String> {
    object
        .get("headline")
        .and_then(Value::as_str)
        .map(collapse_whitespace)
        .filter(|t| !t.is_empty())
}

fn json_ld_author(object: &Value) -> Option<String> {
    let names: Vec<String> = match object.get("author")? {
        Value::Array(items) => items.iter().filter_map(author_name).collect(),
        single => author_name(single).into_iter().collect(),
    };
    (!names.is_empty()).then(|| names.join(", "))
}

fn author_name(value: &Value) -> Option<String> {
    let name = match value {
        Value::String(s) => s.as_str(),
        Value::Object(map) => map.get("name")?.as_str()?,
        _ => return None,
    };
    clean_author(name)
}

fn title_tag(document: &Html) -> Option<String> {
    let selector = Selector::parse("title").ok()?;
    let raw: String = document.select(&selector).next()?.text().collect();
    strip_site_suffix(&collapse_whitespace(&raw))
}

/// Keep the first non-empty segment of a `Post Title | Site Name` style title
pub fn strip_site_suffix(title: &str) -> Option<String> {
    TITLE_SEPARATOR
        .split(title)
        .map(str::trim)
        .find(|segment| !segment.is_empty())
        .map(str::to_string)
}

fn first_h1(blocks: &[ContentBlock], document: &Html) -> Option<String> {
    blocks
        .iter()
        .find_map(|block| match block {
            ContentBlock::Heading { level: 1, text } if !text.trim().is_empty() => {
                Some(text.clone())
            }
            _ => None,
        })
        .or_else(|| {
            let selector = Selector::parse("h1").ok()?;
            document
                .select(&selector)
                .map(|h1| collapse_whitespace(&h1.text().collect::<String>()))
                .find(|t| !t.is_empty())
        })
}

fn byline(document: &Html, blocks: &[ContentBlock], config: &ExtractionConfig) -> Option<String> {
    let from_elements = Selector::parse(BYLINE_SELECTORS).ok().and_then(|selector| {
        document.select(&selector).find_map(|el| {
            let text = collapse_whitespace(&el.text().collect::<String>());
            let text = BY_PREFIX.replace(&text, "");
            clean_author(&text).filter(|name| name.split_whitespace().count() <= 6)
        })
    });

    from_elements.or_else(|| {
        blocks
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Paragraph { text } => Some(text),
                _ => None,
            })
            .take(config.byline_scan_blocks)
            .find_map(|text| BYLINE.captures(text))
            .and_then(|caps| caps.get(1))
            .and_then(|m| clean_author(m.as_str()))
    })
}

fn meta_author(document: &Html) -> Option<String> {
    AUTHOR_META_SELECTORS
        .iter()
        .filter_map(|selector| meta_content(document, selector))
        .find_map(|value| clean_author(&value))
}

fn meta_content(document: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    document
        .select(&selector)
        .filter_map(|el| el.value().attr("content"))
        .map(collapse_whitespace)
        .find(|content| !content.is_empty())
}

/// Reject empty, overlong and URL-valued author strings
fn clean_author(raw: &str) -> Option<String> {
    let name = collapse_whitespace(raw);
    let name = name.trim_matches(|c: char| c == ',' || c == '.' || c == '|').trim();
    if name.is_empty()
        || name.chars().count() > MAX_AUTHOR_CHARS
        || name.starts_with("http://")
        || name.starts_with("https://")
    {
        return None;
    }
    Some(name.to_string())
}
