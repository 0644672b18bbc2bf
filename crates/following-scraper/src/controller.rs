//! The pagination loop.
//!
//! One page at a time: fetch (with retry, backoff and a per-attempt
//! deadline), extract, normalize, dedup, stream to the sink, then decide
//! whether to continue. The only suspension points are the fetch itself and
//! the backoff sleeps; both race the cancel flag.

use crate::config::ScrapeConfig;
use crate::cursor::{Continuation, Cursor};
use crate::dedup::Admission;
use crate::error::{FetchError, FetchFailure};
use crate::export::RecordSink;
use crate::extract::PageExtractor;
use crate::fetch::{Fetcher, PageFragment};
use crate::model::{AbortReason, RunReport, TerminalStatus};
use crate::normalize::Normalizer;
use crate::session::ExtractionSession;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::{debug, info, warn};

#[derive(Debug, Default)]
struct CancelState {
    cancelled: AtomicBool,
    notify: Notify,
}

/// Shared cancellation signal. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag {
    state: Arc<CancelState>,
}

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.state.cancelled.store(true, Ordering::SeqCst);
        self.state.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once [`cancel`](Self::cancel) has been called.
    pub async fn cancelled(&self) {
        let notified = self.state.notify.notified();
        tokio::pin!(notified);
        // Register before checking the flag so a concurrent cancel between
        // the check and the await is not lost.
        notified.as_mut().enable();
        if self.is_cancelled() {
            return;
        }
        notified.await;
    }
}

pub struct PaginationController {
    fetcher: Arc<dyn Fetcher>,
    extractor: Arc<dyn PageExtractor>,
    normalizer: Normalizer,
    config: ScrapeConfig,
    cancel: CancelFlag,
}

impl PaginationController {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        extractor: Arc<dyn PageExtractor>,
        normalizer: Normalizer,
        config: &ScrapeConfig,
    ) -> Self {
        Self {
            fetcher,
            extractor,
            normalizer,
            config: config.clone(),
            cancel: CancelFlag::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Run to a terminal status, streaming accepted records into `sink`.
    ///
    /// The sink always receives the end-of-stream signal, whatever the
    /// outcome; records emitted before an abort stay emitted.
    pub async fn run(&self, sink: &mut dyn RecordSink) -> RunReport {
        let mut session = ExtractionSession::new(self.config.max_items);
        info!(
            limit = self.config.max_items,
            retry_limit = self.config.retry_limit,
            "starting extraction"
        );

        let status = self.drive(&mut session, sink).await;
        let status = match sink.finish(&session.stream_end(status.clone())) {
            Ok(()) => status,
            Err(e) => {
                warn!(error = %e, "sink failed to finish");
                match status {
                    TerminalStatus::Aborted(reason) => TerminalStatus::Aborted(reason),
                    _ => TerminalStatus::Aborted(AbortReason::Sink(e.to_string())),
                }
            }
        };

        if let TerminalStatus::Aborted(reason) = &status {
            warn!(reason = reason.code(), detail = %reason.detail(), "extraction aborted");
        }
        let report = session.into_report(status);
        info!(
            status = %report.status,
            records = report.records,
            duplicates = report.duplicates,
            rejected = report.rejected,
            pages = report.pages,
            elapsed_ms = report.elapsed_ms,
            "extraction finished"
        );
        report
    }

    async fn drive(
        &self,
        session: &mut ExtractionSession,
        sink: &mut dyn RecordSink,
    ) -> TerminalStatus {
        loop {
            if self.cancel.is_cancelled() {
                return TerminalStatus::Aborted(AbortReason::Cancelled);
            }
            if session.limit_reached() {
                return TerminalStatus::LimitReached;
            }

            let cursor = session.cursor().clone();
            let fragment = match self.fetch_page(&cursor, session).await {
                Ok(fragment) => fragment,
                Err(reason) => return TerminalStatus::Aborted(reason),
            };
            session.record_page();

            let extraction = self.extractor.extract(&fragment, &cursor);
            if let Some(warning) = extraction.warning {
                session.record_warning();
                warn!(page = session.pages(), cursor = %cursor, %warning, "page anomaly");
            }

            let mut admitted = 0usize;
            for candidate in &extraction.candidates {
                if session.limit_reached() {
                    break;
                }
                let record = match self.normalizer.normalize(candidate) {
                    Ok(record) => record,
                    Err(e) => {
                        session.record_rejected();
                        debug!(source = candidate.source.as_str(), error = %e, "candidate rejected");
                        continue;
                    }
                };
                if session.admit(&record) == Admission::Duplicate {
                    debug!(id = %record.id, "duplicate skipped");
                    continue;
                }
                if let Err(e) = sink.emit(&record) {
                    return TerminalStatus::Aborted(AbortReason::Sink(e.to_string()));
                }
                session.record_emitted();
                admitted += 1;
            }

            info!(
                page = session.pages(),
                strategy = extraction.strategy.unwrap_or("none"),
                candidates = extraction.candidates.len(),
                admitted,
                total = session.emitted(),
                "page processed"
            );

            if session.limit_reached() {
                return TerminalStatus::LimitReached;
            }
            let next = match extraction.next {
                Continuation::Terminal => return TerminalStatus::Completed,
                Continuation::Next(next) => next,
            };
            let unproductive = session.end_page(admitted);
            if unproductive > self.config.empty_page_threshold {
                info!(
                    unproductive,
                    threshold = self.config.empty_page_threshold,
                    "no new records for too long, treating listing as exhausted"
                );
                return TerminalStatus::Completed;
            }
            session.advance(next);
        }
    }

    /// Fetch one page, retrying transient failures with backoff.
    async fn fetch_page(
        &self,
        cursor: &Cursor,
        session: &mut ExtractionSession,
    ) -> Result<PageFragment, AbortReason> {
        let deadline = self.config.request_timeout();
        let mut attempt = 0u32;
        loop {
            let result = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(AbortReason::Cancelled),
                r = tokio::time::timeout(deadline, self.fetcher.fetch(cursor)) => r,
            };

            let err = match result {
                Ok(Ok(fragment)) => return Ok(fragment),
                Ok(Err(FetchFailure::Access(e))) => return Err(AbortReason::Access(e)),
                Ok(Err(FetchFailure::Transient(e))) => e,
                Err(_) => FetchError::Timeout(deadline),
            };

            if attempt >= self.config.retry_limit {
                return Err(AbortReason::FetchExhausted {
                    attempts: attempt + 1,
                    last_error: err.to_string(),
                });
            }

            let delay = self.config.backoff_delay(attempt, err.retry_after());
            attempt += 1;
            session.record_retry();
            warn!(
                cursor = %cursor,
                attempt,
                error = %err,
                delay_ms = delay.as_millis() as u64,
                "fetch failed, retrying"
            );

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(AbortReason::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}
