//! Batch runner: one extraction per target, sharing an item budget.

use crate::inputs::TargetInput;
use crate::progress::ProgressSink;
use crate::settings::Settings;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use following_scraper::export::open_sink;
use following_scraper::target::{resolve_target, target_slug};
use following_scraper::{
    CancelFlag, Extractor, HttpFetcher, MultiSink, Normalizer, PaginationController, RunReport,
    SessionContext, TerminalStatus,
};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, info_span, Instrument};

/// Result of one target.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetOutcome {
    pub target: String,
    pub listing: Option<String>,
    pub files: Vec<PathBuf>,
    pub report: Option<RunReport>,
    /// Setup failure, or the abort reason when the run aborted.
    pub error: Option<String>,
}

impl TargetOutcome {
    fn failed(target: &str, error: &anyhow::Error) -> Self {
        Self {
            target: target.to_string(),
            listing: None,
            files: Vec::new(),
            report: None,
            error: Some(format!("{error:#}")),
        }
    }

    pub fn records(&self) -> usize {
        self.report.as_ref().map_or(0, |r| r.records)
    }

    /// Targets that never started count as failed runs.
    pub fn exit_code(&self) -> i32 {
        self.report.as_ref().map_or(1, RunReport::exit_code)
    }
}

/// Summary of a whole batch, as printed by `--json`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub targets: Vec<TargetOutcome>,
}

impl BatchSummary {
    pub fn exit_code(&self) -> i32 {
        self.targets
            .iter()
            .map(TargetOutcome::exit_code)
            .max()
            .unwrap_or(0)
    }
}

pub struct Runner {
    settings: Settings,
    session: SessionContext,
    cancel: CancelFlag,
    show_progress: bool,
}

impl Runner {
    pub fn new(settings: Settings, session: SessionContext, cancel: CancelFlag) -> Self {
        Self {
            settings,
            session,
            cancel,
            show_progress: false,
        }
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Run every target in order. `maxItems` from the settings is a budget
    /// across the whole batch; a per-target `maxItems` can only lower it.
    pub async fn run(&self, inputs: &[TargetInput]) -> BatchSummary {
        let started_at = Utc::now();
        let mut remaining = self.settings.scrape.max_items;
        let mut targets = Vec::with_capacity(inputs.len());

        for (index, input) in inputs.iter().enumerate() {
            if self.cancel.is_cancelled() {
                info!(skipped = inputs.len() - index, "interrupted, skipping remaining targets");
                break;
            }
            if remaining == 0 {
                info!(
                    skipped = inputs.len() - index,
                    "item budget exhausted, skipping remaining targets"
                );
                break;
            }

            let limit = input.max_items.unwrap_or(remaining).min(remaining);
            let span = info_span!("target", index, url = %input.url);
            let outcome = match self.run_target(index, input, limit).instrument(span).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!(url = %input.url, "target failed: {e:#}");
                    TargetOutcome::failed(&input.url, &e)
                }
            };
            remaining = remaining.saturating_sub(outcome.records());
            targets.push(outcome);
        }

        BatchSummary {
            started_at,
            finished_at: Utc::now(),
            targets,
        }
    }

    async fn run_target(
        &self,
        index: usize,
        input: &TargetInput,
        limit: usize,
    ) -> Result<TargetOutcome> {
        let mut config = self.settings.scrape.clone();
        config.max_items = limit;
        config.validate()?;

        let base = config.base_url()?;
        let listing = resolve_target(&input.url, &base)?;
        let slug = target_slug(&listing);
        let formats = if input.export_formats.is_empty() {
            self.settings.formats()
        } else {
            input.export_formats.clone()
        };

        let output_dir = self.settings.output_dir();
        let mut sink = MultiSink::new();
        let mut files = Vec::with_capacity(formats.len());
        for format in formats {
            let path = output_dir.join(format!("{index:02}_{slug}.{}", format.extension()));
            let opened = open_sink(format, &path)
                .with_context(|| format!("failed to open {}", path.display()))?;
            sink.push(opened);
            files.push(path);
        }

        let fetcher = HttpFetcher::new(listing.clone(), &config, self.session.clone())?;
        let controller = PaginationController::new(
            Arc::new(fetcher),
            Arc::new(Extractor::new()),
            Normalizer::new(Some(base)),
            &config,
        )
        .with_cancel(self.cancel.clone());

        info!(listing = %listing, limit, "resolved target");
        let report = if self.show_progress {
            let mut progress = ProgressSink::new(sink, &slug);
            controller.run(&mut progress).await
        } else {
            controller.run(&mut sink).await
        };

        let error = match &report.status {
            TerminalStatus::Aborted(reason) => Some(reason.detail()),
            _ => None,
        };
        Ok(TargetOutcome {
            target: input.url.clone(),
            listing: Some(listing.to_string()),
            files,
            report: Some(report),
            error,
        })
    }
}
