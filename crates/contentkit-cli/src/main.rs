//! ContentKit CLI - Command-line interface for normalizing web and PDF content

use clap::{Args, Parser, Subcommand, ValueEnum};
use contentkit::{CrawlOutcome, Ingestor, KnowledgeBaseExport, OutputRecord};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use url::Url;

/// Output format for records
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum OutputFormat {
    /// Markdown with YAML frontmatter, one document per record
    #[default]
    Md,
    /// Knowledge-base export envelope as JSON
    Json,
}

/// ContentKit - normalize blogs, Substack posts and PDF books into Markdown records
#[derive(Parser, Debug)]
#[command(name = "contentkit")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// Identifier copied onto every record
    #[arg(long, global = true, default_value = "")]
    user_id: String,

    /// Team identifier for JSON export
    #[arg(long, global = true)]
    team_id: Option<String>,

    /// Output format
    #[arg(long, short, global = true, default_value = "md")]
    output: OutputFormat,

    /// Custom User-Agent
    #[arg(long, global = true)]
    user_agent: Option<String>,

    /// Per-fetch timeout in seconds
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,

    /// Retries for transient HTTP failures
    #[arg(long, global = true, default_value_t = 0)]
    retries: u32,
}

#[derive(Args, Debug)]
struct CrawlArgs {
    /// Maximum concurrent fetches
    #[arg(long)]
    concurrency: Option<usize>,

    /// Crawl at most this many links
    #[arg(long)]
    max_links: Option<usize>,

    /// Only crawl links under this path or URL prefix
    #[arg(long)]
    include_prefix: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fetch a single page and normalize it
    Page {
        /// URL to fetch
        url: String,
    },
    /// Crawl an index page and normalize every linked article
    Crawl {
        /// Index page URL
        url: String,

        #[command(flatten)]
        crawl: CrawlArgs,
    },
    /// Normalize a URL, crawling it when it looks like an index page
    Ingest {
        /// Page or index URL
        url: String,

        #[command(flatten)]
        crawl: CrawlArgs,
    },
    /// Normalize a PDF layout file into one record per chapter
    Pdf {
        /// Path to the PDF layout JSON
        path: PathBuf,

        /// URL recorded as the source of every chapter
        #[arg(long)]
        source_url: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("contentkit=info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let common = cli.common;

    let outcome = match cli.command {
        Some(Commands::Page { url }) => {
            let ingestor = build_ingestor(&common, None);
            ingestor.normalize_url(&url).await.map(|record| CrawlOutcome {
                records: vec![record],
                failures: Vec::new(),
            })
        }
        Some(Commands::Crawl { url, crawl }) => {
            let ingestor = build_ingestor(&common, Some(&crawl));
            ingestor.crawl_index(&url).await.map_err(Into::into)
        }
        Some(Commands::Ingest { url, crawl }) => {
            let ingestor = build_ingestor(&common, Some(&crawl));
            ingestor.ingest_url(&url).await
        }
        Some(Commands::Pdf { path, source_url }) => {
            run_pdf(&build_ingestor(&common, None), &path, source_url.as_deref())
        }
        None => {
            eprintln!("Usage: contentkit page <URL>");
            eprintln!("   or: contentkit crawl <URL>");
            eprintln!("   or: contentkit ingest <URL>");
            eprintln!("   or: contentkit pdf <LAYOUT.json>");
            eprintln!("   or: contentkit --help");
            std::process::exit(1);
        }
    };

    match outcome {
        Ok(outcome) => print_outcome(outcome, &common),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

fn build_ingestor(common: &CommonArgs, crawl: Option<&CrawlArgs>) -> Ingestor {
    let mut builder = Ingestor::builder()
        .user_id(common.user_id.clone())
        .retries(common.retries);

    if let Some(ref ua) = common.user_agent {
        builder = builder.user_agent(ua.clone());
    }
    if let Some(secs) = common.timeout_secs {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    if let Some(crawl) = crawl {
        if let Some(concurrency) = crawl.concurrency {
            builder = builder.concurrency(concurrency);
        }
        if let Some(max) = crawl.max_links {
            builder = builder.max_links(max);
        }
        if let Some(ref prefix) = crawl.include_prefix {
            builder = builder.include_prefix(prefix.clone());
        }
    }

    builder.build()
}

fn run_pdf(
    ingestor: &Ingestor,
    path: &Path,
    source_url: Option<&str>,
) -> Result<CrawlOutcome, contentkit::NormalizeError> {
    let bytes = std::fs::read(path).unwrap_or_else(|e| {
        eprintln!("Error reading {}: {}", path.display(), e);
        std::process::exit(1);
    });
    let source_url = source_url.map(|s| {
        Url::parse(s).unwrap_or_else(|e| {
            eprintln!("Error: invalid source URL {}: {}", s, e);
            std::process::exit(1);
        })
    });
    let records = ingestor.normalize_pdf_bytes(&bytes, source_url)?;
    Ok(CrawlOutcome {
        records,
        failures: Vec::new(),
    })
}

fn print_outcome(outcome: CrawlOutcome, common: &CommonArgs) {
    for failure in &outcome.failures {
        eprintln!("Failed: {} ({})", failure.url, failure.reason);
    }

    match common.output {
        OutputFormat::Md => writeln_safe(&format_records_md(&outcome.records)),
        OutputFormat::Json => {
            let export = KnowledgeBaseExport::new(common.team_id.as_deref(), outcome.records);
            let json = serde_json::to_string_pretty(&export).unwrap_or_else(|e| {
                eprintln!("Error serializing records: {}", e);
                std::process::exit(1);
            });
            writeln_safe(&json);
        }
    }
}

/// Format records as consecutive markdown documents
fn format_records_md(records: &[OutputRecord]) -> String {
    records
        .iter()
        .map(format_md_with_frontmatter)
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Format a record as markdown with YAML frontmatter
fn format_md_with_frontmatter(record: &OutputRecord) -> String {
    let mut output = String::new();

    output.push_str("---\n");
    if let Some(ref title) = record.title {
        output.push_str(&format!("title: {}\n", yaml_scalar(title)));
    }
    if let Some(ref author) = record.author {
        output.push_str(&format!("author: {}\n", yaml_scalar(author)));
    }
    output.push_str(&format!("content_type: {}\n", record.content_type));
    if let Some(ref url) = record.source_url {
        output.push_str(&format!("source_url: {}\n", url));
    }
    if !record.user_id.is_empty() {
        output.push_str(&format!("user_id: {}\n", yaml_scalar(&record.user_id)));
    }
    output.push_str("---\n");

    output.push_str(&record.content);
    output
}

/// Quote a frontmatter value when YAML would misread it
fn yaml_scalar(value: &str) -> String {
    let needs_quotes = value.contains(": ")
        || value.contains(" #")
        || value.starts_with(|c: char| "\"'[]{}&*!|>%@`#-?,".contains(c));
    if needs_quotes {
        serde_json::to_string(value).unwrap_or_else(|_| value.to_string())
    } else {
        value.to_string()
    }
}

/// Write to stdout, exit silently on broken pipe
fn writeln_safe(s: &str) {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    if let Err(e) = writeln!(handle, "{}", s) {
        if e.kind() == io::ErrorKind::BrokenPipe {
            std::process::exit(0);
        }
        eprintln!("Error writing to stdout: {}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contentkit::ContentType;

    fn record(content: &str) -> OutputRecord {
        OutputRecord {
            title: Some("Borrowing".to_string()),
            content: content.to_string(),
            content_type: ContentType::Blog,
            source_url: Some("https://example.com/blog/borrowing".to_string()),
            author: Some("Ada Lovelace".to_string()),
            user_id: "u-1".to_string(),
        }
    }

    #[test]
    fn test_format_md_basic() {
        let output = format_md_with_frontmatter(&record("# Borrowing\n\nBody"));

        assert!(output.starts_with("---\n"));
        assert!(output.contains("title: Borrowing\n"));
        assert!(output.contains("author: Ada Lovelace\n"));
        assert!(output.contains("content_type: blog\n"));
        assert!(output.contains("source_url: https://example.com/blog/borrowing\n"));
        assert!(output.contains("user_id: u-1\n"));
        assert!(output.ends_with("---\n# Borrowing\n\nBody"));
    }

    #[test]
    fn test_format_md_missing_fields_omitted() {
        let mut record = record("Body");
        record.title = None;
        record.author = None;
        record.source_url = None;
        record.user_id = String::new();

        let output = format_md_with_frontmatter(&record);

        assert_eq!(output, "---\ncontent_type: blog\n---\nBody");
    }

    #[test]
    fn test_format_md_quotes_ambiguous_values() {
        let mut record = record("Body");
        record.title = Some("Rust: The Hard Parts".to_string());

        let output = format_md_with_frontmatter(&record);

        assert!(output.contains("title: \"Rust: The Hard Parts\"\n"));
    }

    #[test]
    fn test_format_records_md_separates_documents() {
        let output = format_records_md(&[record("One"), record("Two")]);
        assert_eq!(output.matches("---\n").count(), 4);
        assert!(output.contains("One\n\n---\n"));
    }

    #[test]
    fn test_cli_parses_crawl_flags() {
        let cli = Cli::parse_from([
            "contentkit",
            "crawl",
            "https://example.com/blog",
            "--concurrency",
            "6",
            "--max-links",
            "20",
            "--user-id",
            "u-9",
            "--output",
            "json",
        ]);
        assert_eq!(cli.common.user_id, "u-9");
        assert!(matches!(cli.common.output, OutputFormat::Json));
        match cli.command {
            Some(Commands::Crawl { url, crawl }) => {
                assert_eq!(url, "https://example.com/blog");
                assert_eq!(crawl.concurrency, Some(6));
                assert_eq!(crawl.max_links, Some(20));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
