//! Heuristic thresholds for extraction and classification
//!
//! Every tunable number used by the pipelines lives here so tests can probe
//! boundary values instead of literals scattered through the logic.

/// Minimum visible characters per descendant tag for a main-content candidate
pub const DEFAULT_MIN_CONTENT_DENSITY: f64 = 20.0;

/// Candidates with less visible text than this are never selected
pub const DEFAULT_MIN_CANDIDATE_TEXT: usize = 25;

/// Score multiplier for containers carrying nav/footer/ad signals
pub const DEFAULT_BOILERPLATE_PENALTY: f64 = 0.1;

/// Link-text share above which a container is treated as link furniture
pub const DEFAULT_LINK_DENSITY_LIMIT: f64 = 0.5;

/// Score multiplier applied past the link-density limit
pub const DEFAULT_LINK_DENSITY_PENALTY: f64 = 0.3;

/// Deepest heading level emitted
pub const DEFAULT_MAX_HEADING_LEVEL: u8 = 6;

/// Paragraphs at the top of the content searched for a `by <Name>` byline
pub const DEFAULT_BYLINE_SCAN_BLOCKS: usize = 8;

/// Font-size ratio over body text marking a PDF chapter boundary
pub const DEFAULT_CHAPTER_FONT_RATIO: f32 = 1.4;

/// Font-size ratio over body text marking a PDF sub-heading
pub const DEFAULT_SUBHEADING_FONT_RATIO: f32 = 1.15;

/// Longest line still considered heading-like
pub const DEFAULT_MAX_HEADING_CHARS: usize = 80;

/// Most words a heading-like line may carry
pub const DEFAULT_MAX_HEADING_WORDS: usize = 12;

/// Share of significant words that must be capitalized for title case
pub const DEFAULT_MIN_TITLE_CASE_SHARE: f64 = 0.6;

/// Substack hosting domain
pub const SUBSTACK_HOST: &str = "substack.com";

/// Path keywords marking interview-prep material
pub const GUIDE_KEYWORDS: &[&str] = &["interview", "guide"];

/// Hosting platforms that only serve blogs
pub const BLOG_HOSTS: &[&str] = &[
    "medium.com",
    "dev.to",
    "hashnode.dev",
    "wordpress.com",
    "blogspot.com",
    "ghost.io",
    "tumblr.com",
];

/// Thresholds and pattern lists for the normalization pipelines
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionConfig {
    pub min_content_density: f64,
    pub min_candidate_text: usize,
    pub boilerplate_penalty: f64,
    pub link_density_limit: f64,
    pub link_density_penalty: f64,
    pub max_heading_level: u8,
    pub byline_scan_blocks: usize,
    pub chapter_font_ratio: f32,
    pub subheading_font_ratio: f32,
    pub max_heading_chars: usize,
    pub max_heading_words: usize,
    pub min_title_case_share: f64,
    /// Host suffixes classified as Substack
    pub substack_hosts: Vec<String>,
    /// Path keywords classified as interview guides
    pub guide_keywords: Vec<String>,
    /// Host suffixes classified as blogs
    pub blog_hosts: Vec<String>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            min_content_density: DEFAULT_MIN_CONTENT_DENSITY,
            min_candidate_text: DEFAULT_MIN_CANDIDATE_TEXT,
            boilerplate_penalty: DEFAULT_BOILERPLATE_PENALTY,
            link_density_limit: DEFAULT_LINK_DENSITY_LIMIT,
            link_density_penalty: DEFAULT_LINK_DENSITY_PENALTY,
            max_heading_level: DEFAULT_MAX_HEADING_LEVEL,
            byline_scan_blocks: DEFAULT_BYLINE_SCAN_BLOCKS,
            chapter_font_ratio: DEFAULT_CHAPTER_FONT_RATIO,
            subheading_font_ratio: DEFAULT_SUBHEADING_FONT_RATIO,
            max_heading_chars: DEFAULT_MAX_HEADING_CHARS,
            max_heading_words: DEFAULT_MAX_HEADING_WORDS,
            min_title_case_share: DEFAULT_MIN_TITLE_CASE_SHARE,
            substack_hosts: vec![SUBSTACK_HOST.to_string()],
            guide_keywords: GUIDE_KEYWORDS.iter().map(|k| k.to_string()).collect(),
            blog_hosts: BLOG_HOSTS.iter().map(|h| h.to_string()).collect(),
        }
    }
}

impl ExtractionConfig {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Returns true if `host` equals `suffix` or is a subdomain of it
pub(crate) fn host_matches(host: &str, suffix: &str) -> bool {
    let host = host.trim_end_matches('.').to_ascii_lowercase();
    let suffix = suffix.trim_start_matches('.').to_ascii_lowercase();
    host == suffix || host.ends_with(&format!(".{}", suffix))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_constants() {
        let config = ExtractionConfig::default();
        assert_eq!(config.min_content_density, DEFAULT_MIN_CONTENT_DENSITY);
        assert_eq!(config.max_heading_level, 6);
        assert_eq!(config.substack_hosts, vec!["substack.com"]);
        assert!(config.guide_keywords.contains(&"interview".to_string()));
        assert!(config.chapter_font_ratio > config.subheading_font_ratio);
    }

    #[test]
    fn test_host_matches() {
        assert!(host_matches("x.substack.com", "substack.com"));
        assert!(host_matches("substack.com", "substack.com"));
        assert!(host_matches("X.Substack.com", ".substack.com"));
        assert!(!host_matches("notsubstack.com", "substack.com"));
        assert!(!host_matches("substack.com.evil.io", "substack.com"));
    }
}
