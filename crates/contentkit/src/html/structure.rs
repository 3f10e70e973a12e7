//! Walks a main-content subtree into an ordered `ContentBlock` sequence

use crate::blocks::{collapse_whitespace, ContentBlock};
use crate::config::ExtractionConfig;
use crate::html::boilerplate::{is_boilerplate, is_skipped};
use scraper::{ElementRef, Node};
use url::Url;

/// Inline-level tags whose content flows into the surrounding paragraph
const INLINE_TAGS: &[&str] = &[
    "a", "abbr", "b", "bdi", "bdo", "cite", "code", "data", "del", "dfn", "em", "i", "ins",
    "kbd", "label", "mark", "q", "s", "samp", "small", "span", "strong", "sub", "sup", "time",
    "u", "var", "wbr", "font", "tt", "strike", "big",
];

#[derive(Debug)]
enum InlinePart {
    Text(String),
    Markup(String),
    Link { text: String, url: String },
    Image { alt: String, url: String },
}

impl InlinePart {
    fn is_blank(&self) -> bool {
        matches!(self, InlinePart::Text(t) if t.trim().is_empty())
    }

    fn render(&self) -> String {
        match self {
            InlinePart::Text(t) | InlinePart::Markup(t) => t.clone(),
            InlinePart::Link { text, url } => format!("[{}]({})", text, url),
            InlinePart::Image { alt, url } => format!("![{}]({})", alt, url),
        }
    }
}

/// Converts DOM subtrees to content blocks in reading order
pub struct Structurer<'c> {
    config: &'c ExtractionConfig,
    base_url: Option<&'c Url>,
    blocks: Vec<ContentBlock>,
    inline: Vec<InlinePart>,
}

impl<'c> Structurer<'c> {
    pub fn new(config: &'c ExtractionConfig, base_url: Option<&'c Url>) -> Self {
        Self {
            config,
            base_url,
            blocks: Vec::new(),
            inline: Vec::new(),
        }
    }

    /// Structure the subtree rooted at `root`
    pub fn structure(mut self, root: ElementRef<'_>) -> Vec<ContentBlock> {
        self.walk_block(root);
        self.flush();
        self.blocks
    }

    fn walk_block(&mut self, element: ElementRef<'_>) {
        for child in element.children() {
            match child.value() {
                Node::Text(text) => self.inline.push(InlinePart::Text(String::from(&**text))),
                Node::Element(_) => {
                    if let Some(child_el) = ElementRef::wrap(child) {
                        self.visit(child_el);
                    }
                }
                _ => {}
            }
        }
    }

    fn visit(&mut self, element: ElementRef<'_>) {
        if is_skipped(element) || is_boilerplate(element) {
            return;
        }
        let name = element.value().name();
        match name {
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                self.flush();
                let level = name[1..].parse::<u8>().unwrap_or(1);
                let text = collapse_whitespace(&element.text().collect::<String>());
                self.push(ContentBlock::heading(
                    level.min(self.config.max_heading_level),
                    text,
                ));
            }
            "p" => {
                self.flush();
                self.walk_inline_children(element);
                self.flush();
            }
            "ul" | "ol" => {
                self.flush();
                self.walk_list(element, name == "ol");
            }
            "pre" => {
                self.flush();
                self.push_code(element);
            }
            "blockquote" => {
                self.flush();
                let inner = Structurer::new(self.config, self.base_url).structure(element);
                let text = inner
                    .iter()
                    .map(ContentBlock::to_markdown)
                    .collect::<Vec<_>>()
                    .join("\n\n");
                self.push(ContentBlock::Quote { text });
            }
            "img" => {
                self.flush();
                if let Some(image) = self.image(element) {
                    self.push(image);
                }
            }
            "br" => self.inline.push(InlinePart::Text(" ".to_string())),
            "hr" => self.flush(),
            _ if INLINE_TAGS.contains(&name) => self.walk_inline(element),
            _ => {
                self.flush();
                self.walk_block(element);
                self.flush();
            }
        }
    }

    fn walk_inline_children(&mut self, element: ElementRef<'_>) {
        for child in element.children() {
            match child.value() {
                Node::Text(text) => self.inline.push(InlinePart::Text(String::from(&**text))),
                Node::Element(_) => {
                    if let Some(child_el) = ElementRef::wrap(child) {
                        if is_skipped(child_el) {
                            continue;
                        }
                        match child_el.value().name() {
                            "img" => {
                                if let Some(ContentBlock::Image { alt, url }) = self.image(child_el)
                                {
                                    self.inline.push(InlinePart::Image { alt, url });
                                }
                            }
                            "br" => self.inline.push(InlinePart::Text(" ".to_string())),
                            _ => self.walk_inline(child_el),
                        }
                    }
                }
                _ => {}
            }
        }
    }

    fn walk_inline(&mut self, element: ElementRef<'_>) {
        let text = collapse_whitespace(&element.text().collect::<String>());
        match element.value().name() {
            "a" => {
                let url = element
                    .value()
                    .attr("href")
                    .and_then(|href| self.resolve(href));
                match url {
                    Some(url) if !text.is_empty() => {
                        self.inline.push(InlinePart::Link { text, url });
                    }
                    _ => self.walk_inline_children(element),
                }
            }
            "strong" | "b" if !text.is_empty() => {
                self.inline.push(InlinePart::Markup(format!("**{}**", text)));
            }
            "em" | "i" if !text.is_empty() => {
                self.inline.push(InlinePart::Markup(format!("*{}*", text)));
            }
            "code" | "kbd" | "samp" | "tt" if !text.is_empty() => {
                self.inline.push(InlinePart::Markup(format!("`{}`", text)));
            }
            _ => self.walk_inline_children(element),
        }
    }

    fn walk_list(&mut self, list: ElementRef<'_>, ordered: bool) {
        for child in list.children().filter_map(ElementRef::wrap) {
            let name = child.value().name();
            if name == "ul" || name == "ol" {
                self.walk_list(child, name == "ol");
                continue;
            }
            if name != "li" || is_skipped(child) {
                continue;
            }

            // Nested lists and code blocks follow the item they belong to
            let mut nested = Vec::new();
            for item_child in child.children() {
                match item_child.value() {
                    Node::Text(text) => self.inline.push(InlinePart::Text(String::from(&**text))),
                    Node::Element(_) => {
                        let Some(el) = ElementRef::wrap(item_child) else {
                            continue;
                        };
                        if is_skipped(el) {
                            continue;
                        }
                        match el.value().name() {
                            "ul" | "ol" | "pre" => nested.push(el),
                            "p" | "div" | "span" => self.walk_inline_children(el),
                            _ => self.walk_inline(el),
                        }
                    }
                    _ => {}
                }
            }
            let text = self.take_inline_text();
            self.push(ContentBlock::ListItem { ordered, text });

            for el in nested {
                match el.value().name() {
                    "pre" => self.push_code(el),
                    name => self.walk_list(el, name == "ol"),
                }
            }
        }
    }

    fn push_code(&mut self, pre: ElementRef<'_>) {
        let code_el = pre
            .children()
            .filter_map(ElementRef::wrap)
            .find(|el| el.value().name() == "code");
        let language = code_language(pre).or_else(|| code_el.and_then(code_language));
        let raw: String = pre.text().collect();
        let code = raw.trim_matches('\n').trim_end().to_string();
        self.push(ContentBlock::CodeBlock { language, code });
    }

    fn image(&self, img: ElementRef<'_>) -> Option<ContentBlock> {
        let src = img
            .value()
            .attr("src")
            .or_else(|| img.value().attr("data-src"))?;
        let url = self.resolve(src)?;
        let alt = img
            .value()
            .attr("alt")
            .map(collapse_whitespace)
            .filter(|alt| !alt.is_empty())
            .unwrap_or_else(|| filename_from_url(&url));
        Some(ContentBlock::Image { alt, url })
    }

    fn resolve(&self, href: &str) -> Option<String> {
        let href = href.trim();
        if href.is_empty() || href.starts_with("javascript:") {
            return None;
        }
        match self.base_url {
            Some(base) => base.join(href).ok().map(|u| u.to_string()),
            None => Some(href.to_string()),
        }
    }

    fn take_inline_text(&mut self) -> String {
        let parts = std::mem::take(&mut self.inline);
        collapse_whitespace(
            &parts
                .iter()
                .map(InlinePart::render)
                .collect::<Vec<_>>()
                .join(""),
        )
    }

    /// Close the pending inline run as a block
    ///
    /// A run holding a single link becomes a `Link` block, a single image an
    /// `Image` block, anything else a `Paragraph`.
    fn flush(&mut self) {
        let meaningful: Vec<&InlinePart> = self.inline.iter().filter(|p| !p.is_blank()).collect();
        let block = match meaningful.as_slice() {
            [] => None,
            [InlinePart::Link { text, url }] => Some(ContentBlock::Link {
                text: text.clone(),
                url: url.clone(),
            }),
            [InlinePart::Image { alt, url }] => Some(ContentBlock::Image {
                alt: alt.clone(),
                url: url.clone(),
            }),
            _ => None,
        };
        match block {
            Some(block) => {
                self.inline.clear();
                self.push(block);
            }
            None if self.inline.is_empty() => {}
            None => {
                let text = self.take_inline_text();
                self.push(ContentBlock::Paragraph { text });
            }
        }
    }

    fn push(&mut self, block: ContentBlock) {
        if !block.is_empty() {
            self.blocks.push(block);
        }
    }
}

/// Language from a `language-xxx` or `lang-xxx` class hint
fn code_language(element: ElementRef<'_>) -> Option<String> {
    element.value().classes().find_map(|class| {
        class
            .strip_prefix("language-")
            .or_else(|| class.strip_prefix("lang-"))
            .filter(|lang| !lang.is_empty())
            .map(str::to_lowercase)
    })
}

/// Last path segment of an image URL, used as alt text fallback
fn filename_from_url(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(path)
        .to_string()
}
