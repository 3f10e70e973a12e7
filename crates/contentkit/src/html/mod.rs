//! HTML pipeline: boilerplate stripping, structuring, metadata
//!
//! [`extract_html`] runs the three stages over one page and hands back the
//! content blocks together with the metadata found in the full document.

mod boilerplate;
mod metadata;
mod structure;

pub use boilerplate::{strip_boilerplate, MainContent};
pub use metadata::{extract_metadata, strip_site_suffix, Confidence, ExtractedMetadata, MetadataField};
pub use structure::Structurer;

pub(crate) use boilerplate::is_boilerplate;

use crate::blocks::ContentBlock;
use crate::config::ExtractionConfig;
use scraper::Html;
use url::Url;

/// Result of running the HTML pipeline over one page
#[derive(Debug, Clone)]
pub struct HtmlExtraction {
    pub blocks: Vec<ContentBlock>,
    pub metadata: ExtractedMetadata,
    /// True when main-content detection fell back to the whole body
    pub fallback: bool,
}

/// Strip, structure and extract metadata from an HTML page
///
/// Relative links and image sources resolve against `base_url` when given.
pub fn extract_html(html: &str, config: &ExtractionConfig, base_url: Option<&Url>) -> HtmlExtraction {
    let document = Html::parse_document(html);
    let main = strip_boilerplate(&document, config);
    let blocks = Structurer::new(config, base_url).structure(main.root);
    let metadata = extract_metadata(&document, &blocks, config);
    HtmlExtraction {
        blocks,
        metadata,
        fallback: main.fallback,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_html_end_to_end() {
        let html = r#"<html><head><title>Caching Strategies | Ops Notes</title></head>
          <body>
            <nav><a href="/">Home</a> <a href="/blog">Blog</a></nav>
            <article>
              <h1>Caching Strategies</h1>
              <p>By Jane Smith</p>
              <p>Write-through caches update the store and the cache together on every write.</p>
              <p>See <a href="/posts/eviction">eviction policies</a> for the read side.</p>
            </article>
            <footer>Copyright</footer>
          </body></html>"#;
        let base = Url::parse("https://ops.example.com/posts/caching").unwrap();
        let out = extract_html(html, &ExtractionConfig::default(), Some(&base));

        assert!(!out.fallback);
        assert_eq!(out.metadata.title(), Some("Caching Strategies"));
        assert_eq!(out.metadata.author(), Some("Jane Smith"));
        assert_eq!(out.blocks[0], ContentBlock::heading(1, "Caching Strategies"));
        assert!(out.blocks.iter().any(|b| matches!(
            b,
            ContentBlock::Paragraph { text } if text.contains("(https://ops.example.com/posts/eviction)")
        )));
        assert!(!out
            .blocks
            .iter()
            .any(|b| b.to_markdown().contains("Copyright")));
    }
}
