//! Settings file plus command-line overrides.

use crate::cli::Cli;
use anyhow::{Context, Result};
use following_scraper::{OutputFormat, ScrapeConfig};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_OUTPUT_DIR: &str = "output";

/// Everything a batch run needs besides its targets.
///
/// Scrape options sit at the top level of the file next to the runner's own
/// keys, e.g. `{"maxItems": 100, "outputDir": "out", "logLevel": "debug"}`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    #[serde(flatten)]
    pub scrape: ScrapeConfig,
    #[serde(alias = "input_file")]
    pub input_file: Option<PathBuf>,
    #[serde(alias = "output_dir")]
    pub output_dir: Option<PathBuf>,
    #[serde(alias = "export_formats")]
    pub export_formats: Vec<OutputFormat>,
    #[serde(alias = "log_level")]
    pub log_level: Option<String>,
    #[serde(alias = "session_file")]
    pub session_file: Option<PathBuf>,
}

impl Settings {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read settings file {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("failed to parse settings file {}", path.display()))
    }

    /// Flags win over file values.
    pub fn apply_overrides(&mut self, cli: &Cli) {
        if let Some(input) = &cli.input {
            self.input_file = Some(input.clone());
        }
        if let Some(dir) = &cli.output_dir {
            self.output_dir = Some(dir.clone());
        }
        if !cli.format.is_empty() {
            self.export_formats = cli.format.clone();
        }
        if let Some(max) = cli.max_items {
            self.scrape.max_items = max;
        }
        if let Some(ms) = cli.timeout_ms {
            self.scrape.timeout_per_request = ms;
        }
        if let Some(n) = cli.retry_limit {
            self.scrape.retry_limit = n;
        }
        if let Some(n) = cli.empty_page_threshold {
            self.scrape.empty_page_threshold = n;
        }
        if let Some(ms) = cli.request_delay_ms {
            self.scrape.request_delay_ms = ms;
        }
        if let Some(session) = &cli.session {
            self.session_file = Some(session.clone());
        }
        if let Some(level) = &cli.log_level {
            self.log_level = Some(level.clone());
        }
    }

    pub fn output_dir(&self) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR))
    }

    /// Requested export formats, falling back to the single `outputFormat`.
    pub fn formats(&self) -> Vec<OutputFormat> {
        if self.export_formats.is_empty() {
            vec![self.scrape.output_format]
        } else {
            self.export_formats.clone()
        }
    }
}
