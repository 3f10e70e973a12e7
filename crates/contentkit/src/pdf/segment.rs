//! Chapter segmentation from page text and font-size hints
//!
//! A line opens a chapter when its font is enlarged past the body size by
//! `chapter_font_ratio` and it reads like a heading (short, title case,
//! all caps or numbered) or repeats a table-of-contents entry. Everything
//! between two boundaries is one chapter.

use crate::blocks::{collapse_whitespace, ContentBlock};
use crate::config::ExtractionConfig;
use crate::error::ParseError;
use crate::types::PdfLayout;
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

/// Title of a chapter when neither a boundary nor metadata names it
pub const UNTITLED: &str = "Untitled";

/// Leading whitespace that turns a line into code
const CODE_INDENT: usize = 4;

/// Words ignored when judging title case
const SMALL_WORDS: &[&str] = &[
    "a", "an", "and", "as", "at", "but", "by", "for", "from", "in", "into", "nor", "of", "on",
    "or", "the", "to", "via", "vs", "with",
];

static NUMBERED_HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?i:(?:chapter|part|section|appendix|book|lesson)\s+(?:\d+|[ivxlcdm]+|one|two|three|four|five|six|seven|eight|nine|ten|[a-z])\b)|^\d+(?:\.\d+)*\.?\s+\p{Lu}",
    )
    .unwrap()
});

static BARE_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?i:(?:chapter|part|section|appendix|book|lesson)\s+(?:\d+|[ivxlcdm]+|one|two|three|four|five|six|seven|eight|nine|ten|[a-z]))\.?$",
    )
    .unwrap()
});

static TOC_ENTRY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.*?\S)\s*(?:(?:\.\s?){4,}|…{2,})\s*(?:\d+|[ivxlcdm]+)$").unwrap()
});

static CONTENTS_HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?i:(?:table\s+of\s+)?contents)$").unwrap());

static PAGE_NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:(?i:page\s+)?\d+(?:\s+(?i:of)\s+\d+)?|[ivxlcdm]{1,6})$").unwrap()
});

static BULLET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[•◦▪‣●○■·*\-–]\s+(.+)$").unwrap());

static ORDERED_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{1,3}[.)]\s+(.+)$").unwrap());

/// One detected chapter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chapter {
    pub title: String,
    pub blocks: Vec<ContentBlock>,
}

/// Chapters of one PDF in document order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segmentation {
    pub chapters: Vec<Chapter>,
    /// Number of chapter boundaries found
    pub boundaries: usize,
}

impl Segmentation {
    /// True when at least one chapter boundary was found
    pub fn is_segmented(&self) -> bool {
        self.boundaries > 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Blank,
    Toc,
    Boundary,
    Subheading,
    Body,
}

#[derive(Debug)]
struct Line<'a> {
    text: &'a str,
    font_size: f32,
    page: u32,
    /// First line of its text block
    block_start: bool,
}

struct Section<'a> {
    title: Option<String>,
    lines: Vec<(&'a Line<'a>, Role)>,
}

/// Split a PDF layout into chapters
pub fn segment_pdf(layout: &PdfLayout, config: &ExtractionConfig) -> Result<Segmentation, ParseError> {
    if layout.pages.is_empty() {
        return Err(ParseError::NoPages);
    }

    let lines = split_lines(layout);
    if lines.iter().all(|line| line.text.trim().is_empty()) {
        return Err(ParseError::EmptyDocument);
    }

    let toc = toc_titles(&lines);
    let body_size = body_font_size(&lines);
    let roles: Vec<Role> = lines
        .iter()
        .map(|line| classify_line(line, body_size, &toc, config))
        .collect();

    let mut sections = vec![Section {
        title: None,
        lines: Vec::new(),
    }];
    let mut boundaries = 0;
    let mut previous_boundary: Option<u32> = None;

    for (line, role) in lines.iter().zip(roles) {
        match role {
            Role::Toc => {}
            Role::Blank => {
                if previous_boundary.is_none() {
                    push_line(&mut sections, line, role);
                }
            }
            Role::Boundary => {
                let text = collapse_whitespace(line.text);
                let continues_title = previous_boundary == Some(line.page)
                    && !NUMBERED_HEADING.is_match(&text);
                match sections.last_mut().and_then(|s| s.title.as_mut()) {
                    Some(title) if continues_title => merge_title(title, &text),
                    _ => {
                        boundaries += 1;
                        sections.push(Section {
                            title: Some(text),
                            lines: Vec::new(),
                        });
                    }
                }
                previous_boundary = Some(line.page);
            }
            Role::Subheading | Role::Body => {
                previous_boundary = None;
                push_line(&mut sections, line, role);
            }
        }
    }

    let metadata_title = layout
        .metadata
        .title
        .as_deref()
        .map(collapse_whitespace)
        .filter(|t| !t.is_empty());

    let chapters = assemble(sections, metadata_title)?;
    Ok(Segmentation {
        chapters,
        boundaries,
    })
}

fn push_line<'a>(sections: &mut [Section<'a>], line: &'a Line<'a>, role: Role) {
    if let Some(section) = sections.last_mut() {
        section.lines.push((line, role));
    }
}

/// Turn sections into chapters, folding empty ones forward
fn assemble(
    sections: Vec<Section<'_>>,
    metadata_title: Option<String>,
) -> Result<Vec<Chapter>, ParseError> {
    let fallback_title = || metadata_title.clone().unwrap_or_else(|| UNTITLED.to_string());
    let mut chapters: Vec<Chapter> = Vec::new();
    let mut carried: Vec<String> = Vec::new();

    for section in sections {
        let body = build_blocks(&section.lines);
        match section.title {
            None if body.is_empty() => {}
            None => chapters.push(Chapter {
                title: fallback_title(),
                blocks: body,
            }),
            Some(title) if body.is_empty() => carried.push(title),
            Some(title) => {
                let mut blocks: Vec<ContentBlock> = carried
                    .drain(..)
                    .map(|t| ContentBlock::heading(1, t))
                    .collect();
                blocks.push(ContentBlock::heading(1, title.clone()));
                blocks.extend(body);
                chapters.push(Chapter { title, blocks });
            }
        }
    }

    if !carried.is_empty() {
        match chapters.last_mut() {
            Some(last) => last
                .blocks
                .extend(carried.into_iter().map(|t| ContentBlock::heading(2, t))),
            None => {
                let title = carried[0].clone();
                let blocks = carried
                    .into_iter()
                    .map(|t| ContentBlock::heading(1, t))
                    .collect();
                chapters.push(Chapter { title, blocks });
            }
        }
    }

    if chapters.is_empty() {
        return Err(ParseError::EmptyDocument);
    }
    Ok(chapters)
}

fn split_lines(layout: &PdfLayout) -> Vec<Line<'_>> {
    let mut lines = Vec::new();
    for page in &layout.pages {
        for block in &page.blocks {
            for (i, text) in block.text.lines().enumerate() {
                lines.push(Line {
                    text,
                    font_size: block.font_size,
                    page: page.number,
                    block_start: i == 0,
                });
            }
        }
    }
    lines
}

fn is_toc_line(text: &str) -> bool {
    TOC_ENTRY.is_match(text) || CONTENTS_HEADING.is_match(text)
}

fn toc_key(text: &str) -> String {
    collapse_whitespace(text)
        .trim_end_matches(['.', ':'])
        .to_lowercase()
}

/// Titles listed in dot-leader table-of-contents lines
fn toc_titles(lines: &[Line<'_>]) -> HashSet<String> {
    lines
        .iter()
        .filter_map(|line| TOC_ENTRY.captures(line.text.trim()))
        .filter_map(|caps| caps.get(1).map(|m| toc_key(m.as_str())))
        .filter(|key| !key.is_empty())
        .collect()
}

/// Character-weighted median font size of non-TOC text
fn body_font_size(lines: &[Line<'_>]) -> f32 {
    let mut sizes: Vec<(f32, usize)> = lines
        .iter()
        .filter(|line| line.font_size.is_finite() && line.font_size > 0.0)
        .map(|line| (line.font_size, line.text.trim()))
        .filter(|(_, text)| !text.is_empty() && !is_toc_line(text))
        .map(|(size, text)| (size, text.chars().count()))
        .collect();
    sizes.sort_by(|a, b| a.0.total_cmp(&b.0));

    let total: usize = sizes.iter().map(|(_, n)| n).sum();
    let mut seen = 0;
    for (size, n) in sizes {
        seen += n;
        if seen * 2 >= total {
            return size;
        }
    }
    0.0
}

fn enlarged(font_size: f32, body_size: f32, ratio: f32) -> bool {
    body_size > 0.0 && font_size >= body_size * ratio
}

fn classify_line(
    line: &Line<'_>,
    body_size: f32,
    toc: &HashSet<String>,
    config: &ExtractionConfig,
) -> Role {
    let text = line.text.trim();
    if text.is_empty() {
        return Role::Blank;
    }
    if is_toc_line(text) {
        return Role::Toc;
    }
    let heading_like = is_heading_like(text, config);
    if enlarged(line.font_size, body_size, config.chapter_font_ratio)
        && (heading_like || toc.contains(&toc_key(text)))
    {
        Role::Boundary
    } else if enlarged(line.font_size, body_size, config.subheading_font_ratio) && heading_like {
        Role::Subheading
    } else {
        Role::Body
    }
}

/// Short line that is numbered, all caps or title case
pub(crate) fn is_heading_like(text: &str, config: &ExtractionConfig) -> bool {
    let text = text.trim();
    if text.is_empty()
        || text.chars().count() > config.max_heading_chars
        || text.split_whitespace().count() > config.max_heading_words
    {
        return false;
    }
    let numbered = NUMBERED_HEADING.is_match(text);
    if text.ends_with(['.', ',', ';']) && !numbered {
        return false;
    }
    numbered || is_all_caps(text) || is_title_case(text, config.min_title_case_share)
}

fn is_all_caps(text: &str) -> bool {
    let letters: Vec<char> = text.chars().filter(|c| c.is_alphabetic()).collect();
    letters.len() >= 2 && letters.iter().all(|c| c.is_uppercase())
}

fn is_title_case(text: &str, min_share: f64) -> bool {
    let mut significant = 0usize;
    let mut capitalized = 0usize;
    for (i, word) in text.split_whitespace().enumerate() {
        let word = word.trim_matches(|c: char| !c.is_alphanumeric());
        let Some(first) = word.chars().next() else {
            continue;
        };
        if !first.is_alphabetic() || (i > 0 && SMALL_WORDS.contains(&word.to_lowercase().as_str()))
        {
            continue;
        }
        significant += 1;
        if first.is_uppercase() {
            capitalized += 1;
        }
    }
    significant > 0 && capitalized as f64 / significant as f64 >= min_share
}

fn merge_title(title: &mut String, next: &str) {
    if BARE_LABEL.is_match(title) {
        title.truncate(title.trim_end_matches('.').len());
        title.push_str(": ");
    } else {
        title.push(' ');
    }
    title.push_str(next);
}

fn build_blocks(lines: &[(&Line<'_>, Role)]) -> Vec<ContentBlock> {
    let mut builder = BlockBuilder::default();
    for (line, role) in lines {
        builder.push(line, *role);
    }
    builder.finish()
}

enum OpenText {
    Paragraph(String),
    Item { ordered: bool, text: String },
}

impl OpenText {
    fn text(&self) -> &str {
        match self {
            OpenText::Paragraph(text) | OpenText::Item { text, .. } => text,
        }
    }

    fn text_mut(&mut self) -> &mut String {
        match self {
            OpenText::Paragraph(text) | OpenText::Item { text, .. } => text,
        }
    }
}

/// Regroups body lines into paragraphs, list items and code blocks
#[derive(Default)]
struct BlockBuilder {
    blocks: Vec<ContentBlock>,
    open: Option<OpenText>,
    code: Vec<String>,
    last_page: Option<u32>,
}

impl BlockBuilder {
    fn push(&mut self, line: &Line<'_>, role: Role) {
        let page_break = self.last_page.is_some_and(|page| page != line.page);
        self.last_page = Some(line.page);

        match role {
            Role::Blank => {
                self.flush_text();
                if !self.code.is_empty() {
                    self.code.push(String::new());
                }
            }
            Role::Subheading => {
                self.flush_text();
                self.flush_code();
                self.blocks
                    .push(ContentBlock::heading(2, collapse_whitespace(line.text)));
            }
            _ => self.push_body(line, page_break),
        }
    }

    fn push_body(&mut self, line: &Line<'_>, page_break: bool) {
        let trimmed = line.text.trim();
        if PAGE_NUMBER.is_match(trimmed) {
            return;
        }

        let expanded = line.text.replace('\t', "    ");
        if leading_whitespace(&expanded) >= CODE_INDENT {
            self.flush_text();
            self.code.push(expanded.trim_end().to_string());
            return;
        }
        self.flush_code();

        if let Some(caps) = BULLET.captures(trimmed) {
            self.open_item(false, &caps[1]);
            return;
        }
        if let Some(caps) = ORDERED_ITEM.captures(trimmed) {
            self.open_item(true, &caps[1]);
            return;
        }

        let continues = match &self.open {
            None => false,
            Some(open) if page_break => !ends_sentence(open.text()),
            Some(_) => !line.block_start,
        };
        if !continues {
            self.flush_text();
        }
        let open = self
            .open
            .get_or_insert_with(|| OpenText::Paragraph(String::new()));
        append_line(open.text_mut(), trimmed);
    }

    fn open_item(&mut self, ordered: bool, text: &str) {
        self.flush_text();
        self.open = Some(OpenText::Item {
            ordered,
            text: collapse_whitespace(text),
        });
    }

    fn flush_text(&mut self) {
        let block = match self.open.take() {
            Some(OpenText::Paragraph(text)) => ContentBlock::paragraph(text),
            Some(OpenText::Item { ordered, text }) => ContentBlock::list_item(ordered, text),
            None => return,
        };
        if !block.is_empty() {
            self.blocks.push(block);
        }
    }

    fn flush_code(&mut self) {
        while self.code.last().is_some_and(|l| l.trim().is_empty()) {
            self.code.pop();
        }
        if self.code.is_empty() {
            return;
        }
        let lines = std::mem::take(&mut self.code);
        let indent = lines
            .iter()
            .filter(|l| !l.trim().is_empty())
            .map(|l| leading_whitespace(l))
            .min()
            .unwrap_or(0);
        let code = lines
            .iter()
            .map(|l| strip_chars(l, indent).trim_end())
            .collect::<Vec<_>>()
            .join("\n");
        self.blocks.push(ContentBlock::CodeBlock {
            language: None,
            code,
        });
    }

    fn finish(mut self) -> Vec<ContentBlock> {
        self.flush_text();
        self.flush_code();
        self.blocks
    }
}

fn ends_sentence(text: &str) -> bool {
    text.trim_end()
        .ends_with(['.', '!', '?', ':', '"', '\u{201d}'])
}

/// Append a wrapped line, re-joining words hyphenated across the break
fn append_line(buffer: &mut String, line: &str) {
    let line = collapse_whitespace(line);
    if buffer.is_empty() {
        buffer.push_str(&line);
        return;
    }
    let hyphenated = buffer.ends_with('-')
        && buffer
            .chars()
            .rev()
            .nth(1)
            .is_some_and(|c| c.is_alphabetic())
        && line.chars().next().is_some_and(|c| c.is_lowercase());
    if hyphenated {
        buffer.pop();
    } else {
        buffer.push(' ');
    }
    buffer.push_str(&line);
}

/// Leading whitespace measured in chars, not bytes
fn leading_whitespace(line: &str) -> usize {
    line.chars().take_while(|c| c.is_whitespace()).count()
}

fn strip_chars(line: &str, count: usize) -> &str {
    match line.char_indices().nth(count) {
        Some((offset, _)) => &line[offset..],
        None => "",
    }
}
