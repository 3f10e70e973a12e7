//! Main-content detection
//!
//! Every container element is scored by text density (visible characters per
//! descendant tag, a `pre` subtree counting as one tag) weighted by its amount of text, then penalized for
//! boilerplate signals: nav/footer/ad tag names and class tokens, and a high
//! share of link text. The best container clearing the density threshold wins;
//! if none does, the whole body is used.

use crate::config::ExtractionConfig;
use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};
use std::sync::LazyLock;
use tracing::debug;

/// Elements that never carry readable content
const SKIPPED_TAGS: &[&str] = &[
    "script", "style", "noscript", "template", "svg", "iframe", "button", "input", "select",
    "textarea", "canvas", "object", "head",
];

/// Tags that are page furniture wherever they appear
const BOILERPLATE_TAGS: &[&str] = &["nav", "footer", "aside", "form", "menu", "dialog"];

/// ARIA landmark roles for page furniture
const BOILERPLATE_ROLES: &[&str] = &[
    "navigation",
    "banner",
    "contentinfo",
    "complementary",
    "search",
    "dialog",
];

/// Containers eligible to be the main-content root
const CANDIDATE_TAGS: &[&str] = &["article", "main", "section", "div", "td"];

static BOILERPLATE_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(nav|navbar|navigation|menu|footer|sidebar|comments?|ads?|adverts?|advertisement|sponsor|sponsored|promo|promos|promotion|share|sharing|social|related|cookies?|banner|newsletter|subscribe|subscription|breadcrumbs?|pagination|pager|popup|modal|widget)$",
    )
    .unwrap()
});

/// The subtree judged to hold the main content
#[derive(Debug, Clone, Copy)]
pub struct MainContent<'a> {
    pub root: ElementRef<'a>,
    /// True when no container cleared the threshold and the body was used
    pub fallback: bool,
}

#[derive(Debug, Default, Clone, Copy)]
struct SubtreeStats {
    text_len: usize,
    link_text_len: usize,
    tags: usize,
}

impl SubtreeStats {
    fn density(&self) -> f64 {
        self.text_len as f64 / self.tags.max(1) as f64
    }

    fn link_density(&self) -> f64 {
        if self.text_len == 0 {
            1.0
        } else {
            self.link_text_len as f64 / self.text_len as f64
        }
    }
}

struct Candidate<'a> {
    element: ElementRef<'a>,
    stats: SubtreeStats,
    boilerplate: bool,
}

/// Select the main-content subtree of a parsed document
pub fn strip_boilerplate<'a>(document: &'a Html, config: &ExtractionConfig) -> MainContent<'a> {
    let mut candidates = Vec::new();
    measure(document.root_element(), false, false, &mut candidates);

    let mut best: Option<(f64, &Candidate<'a>)> = None;
    for candidate in &candidates {
        let stats = candidate.stats;
        if stats.text_len < config.min_candidate_text
            || stats.density() < config.min_content_density
        {
            continue;
        }
        let score = score(candidate, config);
        let better = match best {
            None => true,
            Some((best_score, best_candidate)) => {
                score > best_score
                    || (score == best_score
                        && stats.text_len > best_candidate.stats.text_len)
            }
        };
        if better {
            best = Some((score, candidate));
        }
    }

    match best {
        Some((score, candidate)) => {
            debug!(
                tag = candidate.element.value().name(),
                score,
                text_len = candidate.stats.text_len,
                "Selected main content container"
            );
            MainContent {
                root: candidate.element,
                fallback: false,
            }
        }
        None => {
            debug!("No container cleared the density threshold, using body");
            MainContent {
                root: body_or_root(document),
                fallback: true,
            }
        }
    }
}

fn score(candidate: &Candidate<'_>, config: &ExtractionConfig) -> f64 {
    let stats = candidate.stats;
    let link_density = stats.link_density();
    let mut score = stats.density().sqrt() * stats.text_len as f64 * (1.0 - link_density);
    if link_density > config.link_density_limit {
        score *= config.link_density_penalty;
    }
    if candidate.boilerplate {
        score *= config.boilerplate_penalty;
    }
    score
}

/// Post-order walk collecting stats for every candidate container
///
/// Boilerplate subtrees are still visited (so they can be scored and
/// penalized) but do not contribute to their ancestors' stats.
fn measure<'a>(
    element: ElementRef<'a>,
    in_link: bool,
    in_boilerplate: bool,
    candidates: &mut Vec<Candidate<'a>>,
) -> SubtreeStats {
    let mut stats = SubtreeStats::default();
    let in_link = in_link || element.value().name() == "a";

    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                let len = text.trim().chars().count();
                stats.text_len += len;
                if in_link {
                    stats.link_text_len += len;
                }
            }
            Node::Element(_) => {
                let Some(child_el) = ElementRef::wrap(child) else {
                    continue;
                };
                if is_skipped(child_el) {
                    continue;
                }
                let furniture = is_boilerplate(child_el);
                let child_stats =
                    measure(child_el, in_link, in_boilerplate || furniture, candidates);
                if furniture {
                    continue;
                }
                stats.tags += child_stats.tags + 1;
                stats.text_len += child_stats.text_len;
                stats.link_text_len += child_stats.link_text_len;
            }
            _ => {}
        }
    }

    // Highlighter markup inside a code block counts as a single tag
    if element.value().name() == "pre" {
        stats.tags = 0;
    }

    if CANDIDATE_TAGS.contains(&element.value().name()) {
        candidates.push(Candidate {
            element,
            stats,
            boilerplate: in_boilerplate || is_boilerplate(element),
        });
    }
    stats
}

/// Elements whose content is never readable text
pub(crate) fn is_skipped(element: ElementRef<'_>) -> bool {
    SKIPPED_TAGS.contains(&element.value().name())
        || element.value().attr("hidden").is_some()
        || element.value().attr("aria-hidden") == Some("true")
}

/// Page furniture: navigation, footers, sidebars, ads, comment sections
pub(crate) fn is_boilerplate(element: ElementRef<'_>) -> bool {
    let value = element.value();
    let name = value.name();

    if BOILERPLATE_TAGS.contains(&name) {
        return true;
    }
    // A header inside an article is the article's own title block
    if name == "header" && !has_ancestor(element, &["article", "main"]) {
        return true;
    }
    if value
        .attr("role")
        .is_some_and(|role| BOILERPLATE_ROLES.contains(&role.to_ascii_lowercase().as_str()))
    {
        return true;
    }

    value
        .attr("class")
        .into_iter()
        .chain(value.attr("id"))
        .flat_map(str::split_whitespace)
        .any(is_boilerplate_token)
}

fn is_boilerplate_token(token: &str) -> bool {
    token
        .to_ascii_lowercase()
        .split(['-', '_'])
        .any(|part| BOILERPLATE_TOKEN.is_match(part))
}

pub(crate) fn has_ancestor(element: ElementRef<'_>, names: &[&str]) -> bool {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .any(|ancestor| names.contains(&ancestor.value().name()))
}

fn body_or_root(document: &Html) -> ElementRef<'_> {
    Selector::parse("body")
        .ok()
        .and_then(|selector| document.select(&selector).next())
        .unwrap_or_else(|| document.root_element())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARTICLE_PAGE: &str = r#"<!DOCTYPE html>
<html><head><title>Post</title></head>
<body>
  <nav class="site-nav"><ul>
    <li><a href="/">Home</a></li><li><a href="/blog">Blog</a></li>
    <li><a href="/about">About</a></li><li><a href="/contact">Contact</a></li>
  </ul></nav>
  <div class="layout">
    <article class="post">
      <h1>Understanding Ownership</h1>
      <p>Ownership is the set of rules that govern how a program manages memory while it runs.</p>
      <p>Every value has a single owner, and the value is dropped when the owner goes out of scope.</p>
      <p>Borrowing lets code use a value without taking ownership of it, either shared or mutable.</p>
    </article>
    <div class="sidebar-widgets"><a href="/x">Popular post one</a> <a href="/y">Popular post two</a></div>
  </div>
  <footer class="footer"><p>Copyright 2024 Example Inc. All rights reserved. Terms and privacy policy apply.</p></footer>
</body></html>"#;

    fn root_name(html: &str) -> (String, bool) {
        let document = Html::parse_document(html);
        let main = strip_boilerplate(&document, &ExtractionConfig::default());
        (main.root.value().name().to_string(), main.fallback)
    }

    #[test]
    fn test_selects_article_over_layout() {
        let document = Html::parse_document(ARTICLE_PAGE);
        let main = strip_boilerplate(&document, &ExtractionConfig::default());
        assert!(!main.fallback);
        assert_eq!(main.root.value().name(), "article");
        let text: String = main.root.text().collect();
        assert!(text.contains("Ownership is the set of rules"));
        assert!(!text.contains("Copyright"));
    }

    #[test]
    fn test_falls_back_to_body_when_nothing_is_dense() {
        let html = r#"<html><body><div><a href="/a">A</a> <a href="/b">B</a></div></body></html>"#;
        assert_eq!(root_name(html), ("body".to_string(), true));
    }

    #[test]
    fn test_density_threshold_is_configurable() {
        let document = Html::parse_document(ARTICLE_PAGE);
        let config = ExtractionConfig {
            min_content_density: 10_000.0,
            ..Default::default()
        };
        let main = strip_boilerplate(&document, &config);
        assert!(main.fallback);
        assert_eq!(main.root.value().name(), "body");
    }

    #[test]
    fn test_dense_footer_is_penalized() {
        let html = r#"<html><body>
          <div class="footer">This legal disclaimer is a very long block of dense text that has no links at all and goes on and on about terms of use, privacy, cookies, and liability for a very long time indeed.</div>
          <article><p>Short but real article text about async runtimes.</p><p>It explains how executors poll futures to completion.</p></article>
        </body></html>"#;
        assert_eq!(root_name(html).0, "article");
    }

    #[test]
    fn test_link_heavy_container_loses() {
        let html = r#"<html><body>
          <div id="links"><a href="/1">First related article title here</a> <a href="/2">Second related article title here</a> <a href="/3">Third related article</a></div>
          <section><p>Plain explanatory prose about B-trees and how they keep pages balanced on disk.</p></section>
        </body></html>"#;
        assert_eq!(root_name(html).0, "section");
    }

    #[test]
    fn test_highlighted_code_does_not_sink_article() {
        let spans: String = (0..60)
            .map(|i| format!(r#"<span class="tok-kw">let</span> <span class="tok-var">v{i}</span>"#))
            .collect::<Vec<_>>()
            .join("\n");
        let html = format!(
            r#"<html><body><article>
              <h1>Zero-Copy Parsing</h1>
              <div class="intro">Zero-copy parsing borrows from the input buffer instead of allocating owned strings.</div>
              <p>The parser keeps lifetimes tied to the buffer so every token is a slice into the original bytes.</p>
              <pre><code class="language-rust">{spans}</code></pre>
              <p>In conclusion, borrowing from the input removes most allocations from the hot path.</p>
            </article></body></html>"#
        );
        let document = Html::parse_document(&html);
        let main = strip_boilerplate(&document, &ExtractionConfig::default());
        assert!(!main.fallback);
        assert_eq!(main.root.value().name(), "article");
        let text: String = main.root.text().collect();
        assert!(text.contains("every token is a slice"));
        assert!(text.contains("let v59"));
        assert!(text.contains("In conclusion"));
    }

    #[test]
    fn test_boilerplate_detection() {
        let html = r#"<html><body>
          <div class="post-share-buttons" id="a"></div>
          <div class="content" id="b"></div>
          <header id="c"></header>
          <article><header id="d"></header></article>
          <div role="navigation" id="e"></div>
          <div class="comments-area" id="f"></div>
        </body></html>"#;
        let document = Html::parse_document(html);
        let check = |id: &str| {
            let selector = Selector::parse(&format!("#{}", id)).unwrap();
            is_boilerplate(document.select(&selector).next().unwrap())
        };
        assert!(check("a"));
        assert!(!check("b"));
        assert!(check("c"));
        assert!(!check("d"));
        assert!(check("e"));
        assert!(check("f"));
    }
}
