//! Command-line arguments.

use clap::Parser;
use following_scraper::OutputFormat;
use std::path::PathBuf;

/// Extract the profiles a social profile follows and export them.
#[derive(Debug, Default, Parser)]
#[command(name = "following-scraper-cli", version, about)]
pub struct Cli {
    /// Profile URLs, vanity names or numeric profile ids.
    pub targets: Vec<String>,

    /// Inputs file: JSON array of {url, maxItems, exportFormats} or one URL per line.
    #[arg(short, long, env = "FOLLOWING_INPUT")]
    pub input: Option<PathBuf>,

    /// JSON settings file.
    #[arg(short = 'c', long, env = "FOLLOWING_SETTINGS")]
    pub settings: Option<PathBuf>,

    /// Directory for export files [default: output].
    #[arg(short, long, env = "FOLLOWING_OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Export formats, comma separated (json, jsonl, csv, html, xml, xlsx).
    #[arg(short, long, value_delimiter = ',')]
    pub format: Vec<OutputFormat>,

    /// Maximum records across all targets.
    #[arg(short, long, env = "FOLLOWING_MAX_ITEMS")]
    pub max_items: Option<usize>,

    /// Per-request deadline in milliseconds.
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Retries per page before giving up.
    #[arg(long)]
    pub retry_limit: Option<u32>,

    /// Consecutive pages without new records before the listing is treated as exhausted.
    #[arg(long)]
    pub empty_page_threshold: Option<u32>,

    /// Minimum gap between requests in milliseconds.
    #[arg(long)]
    pub request_delay_ms: Option<u64>,

    /// JSON file with cookies, headers and form tokens for authenticated fetches.
    #[arg(long, env = "FOLLOWING_SESSION")]
    pub session: Option<PathBuf>,

    /// Log level for the scraper (error, warn, info, debug, trace). Overrides RUST_LOG.
    #[arg(long, env = "FOLLOWING_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Emit logs as JSON lines.
    #[arg(long)]
    pub log_json: bool,

    /// Print the run summary as JSON on stdout.
    #[arg(long)]
    pub json: bool,

    /// No progress display or summary.
    #[arg(short, long)]
    pub quiet: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_command_line() {
        let cli = Cli::try_parse_from([
            "following-scraper",
            "UncutMagazine",
            "100012345678900",
            "-o",
            "out",
            "-f",
            "json,csv",
            "--max-items",
            "40",
            "--retry-limit",
            "5",
            "--quiet",
        ])
        .unwrap();
        assert_eq!(cli.targets, vec!["UncutMagazine", "100012345678900"]);
        assert_eq!(cli.output_dir, Some(PathBuf::from("out")));
        assert_eq!(cli.format, vec![OutputFormat::Json, OutputFormat::Csv]);
        assert_eq!(cli.max_items, Some(40));
        assert_eq!(cli.retry_limit, Some(5));
        assert!(cli.quiet);
    }

    #[test]
    fn test_unknown_format_rejected() {
        assert!(Cli::try_parse_from(["following-scraper", "x", "-f", "pdf"]).is_err());
    }
}
