//! Typed content blocks and their Markdown rendering
//!
//! Both the HTML and PDF pipelines converge on a flat, ordered
//! `Vec<ContentBlock>`. Rendering is a pure function of that sequence, so
//! rendering the same blocks twice always yields byte-identical Markdown.

/// One structurally typed unit of normalized content
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentBlock {
    Heading { level: u8, text: String },
    Paragraph { text: String },
    ListItem { ordered: bool, text: String },
    CodeBlock { language: Option<String>, code: String },
    Quote { text: String },
    Image { alt: String, url: String },
    Link { text: String, url: String },
}

impl ContentBlock {
    pub fn heading(level: u8, text: impl Into<String>) -> Self {
        ContentBlock::Heading {
            level: level.clamp(1, 6),
            text: text.into(),
        }
    }

    pub fn paragraph(text: impl Into<String>) -> Self {
        ContentBlock::Paragraph { text: text.into() }
    }

    pub fn list_item(ordered: bool, text: impl Into<String>) -> Self {
        ContentBlock::ListItem {
            ordered,
            text: text.into(),
        }
    }

    /// True when the block carries nothing but whitespace
    pub fn is_empty(&self) -> bool {
        match self {
            ContentBlock::Heading { text, .. }
            | ContentBlock::Paragraph { text }
            | ContentBlock::ListItem { text, .. }
            | ContentBlock::Quote { text } => text.trim().is_empty(),
            ContentBlock::CodeBlock { code, .. } => code.trim().is_empty(),
            ContentBlock::Image { url, .. } => url.trim().is_empty(),
            ContentBlock::Link { text, url } => text.trim().is_empty() || url.trim().is_empty(),
        }
    }

    /// Render this block alone
    pub fn to_markdown(&self) -> String {
        match self {
            ContentBlock::Heading { level, text } => {
                format!("{} {}", "#".repeat(usize::from(*level)), text)
            }
            ContentBlock::Paragraph { text } => text.clone(),
            ContentBlock::ListItem { ordered, text } => {
                if *ordered {
                    format!("1. {}", text)
                } else {
                    format!("- {}", text)
                }
            }
            ContentBlock::CodeBlock { language, code } => {
                let fence = code_fence(code);
                format!(
                    "{}{}\n{}\n{}",
                    fence,
                    language.as_deref().unwrap_or(""),
                    code,
                    fence
                )
            }
            ContentBlock::Quote { text } => text
                .lines()
                .map(|line| {
                    if line.is_empty() {
                        ">".to_string()
                    } else {
                        format!("> {}", line)
                    }
                })
                .collect::<Vec<_>>()
                .join("\n"),
            ContentBlock::Image { alt, url } => format!("![{}]({})", alt, url),
            ContentBlock::Link { text, url } => format!("[{}]({})", text, url),
        }
    }
}

/// Render an ordered block sequence to Markdown
///
/// Adjacent list items of the same kind stay on consecutive lines; every
/// other pair of blocks is separated by a blank line. Non-empty output ends
/// with a single newline.
pub fn render_markdown(blocks: &[ContentBlock]) -> String {
    let mut output = String::new();
    let mut previous: Option<&ContentBlock> = None;

    for block in blocks.iter().filter(|b| !b.is_empty()) {
        if let Some(prev) = previous {
            if same_list_run(prev, block) {
                output.push('\n');
            } else {
                output.push_str("\n\n");
            }
        }
        output.push_str(&block.to_markdown());
        previous = Some(block);
    }

    if !output.is_empty() {
        output.push('\n');
    }
    output
}

fn same_list_run(a: &ContentBlock, b: &ContentBlock) -> bool {
    matches!(
        (a, b),
        (
            ContentBlock::ListItem { ordered: x, .. },
            ContentBlock::ListItem { ordered: y, .. }
        ) if x == y
    )
}

/// Backtick fence one longer than the longest backtick run inside the code
fn code_fence(code: &str) -> String {
    let mut longest = 0;
    let mut run = 0;
    for c in code.chars() {
        if c == '`' {
            run += 1;
            longest = longest.max(run);
        } else {
            run = 0;
        }
    }
    "`".repeat((longest + 1).max(3))
}

/// Collapse whitespace runs to single spaces and trim
pub(crate) fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
