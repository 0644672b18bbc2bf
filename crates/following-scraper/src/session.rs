//! Mutable state of one extraction run, owned by the controller.

use crate::cursor::Cursor;
use crate::dedup::{Admission, Deduplicator};
use crate::model::{FollowedProfile, RunReport, StreamEnd, TerminalStatus};
use std::time::Instant;

#[derive(Debug)]
pub struct ExtractionSession {
    limit: usize,
    cursor: Cursor,
    emitted: usize,
    pages: u32,
    retries: u32,
    /// Consecutive pages that admitted nothing new.
    unproductive: u32,
    duplicates: usize,
    rejected: usize,
    warnings: usize,
    dedup: Deduplicator,
    started: Instant,
}

impl ExtractionSession {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            cursor: Cursor::Initial,
            emitted: 0,
            pages: 0,
            retries: 0,
            unproductive: 0,
            duplicates: 0,
            rejected: 0,
            warnings: 0,
            dedup: Deduplicator::new(),
            started: Instant::now(),
        }
    }

    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    pub fn advance(&mut self, next: Cursor) {
        self.cursor = next;
    }

    pub fn emitted(&self) -> usize {
        self.emitted
    }

    pub fn limit_reached(&self) -> bool {
        self.emitted >= self.limit
    }

    pub fn pages(&self) -> u32 {
        self.pages
    }

    pub fn record_page(&mut self) {
        self.pages += 1;
    }

    pub fn record_retry(&mut self) {
        self.retries += 1;
    }

    pub fn record_warning(&mut self) {
        self.warnings += 1;
    }

    pub fn record_rejected(&mut self) {
        self.rejected += 1;
    }

    /// Offer a record to the deduplicator, counting repeats.
    pub fn admit(&mut self, record: &FollowedProfile) -> Admission {
        let admission = self.dedup.admit(record);
        if admission == Admission::Duplicate {
            self.duplicates += 1;
        }
        admission
    }

    /// Count a record once the sink has accepted it.
    pub fn record_emitted(&mut self) {
        self.emitted += 1;
    }

    /// Close out a page that admitted `admitted` new records and return the
    /// length of the current run of unproductive pages.
    pub fn end_page(&mut self, admitted: usize) -> u32 {
        if admitted > 0 {
            self.unproductive = 0;
        } else {
            self.unproductive += 1;
        }
        self.unproductive
    }

    pub fn stream_end(&self, status: TerminalStatus) -> StreamEnd {
        StreamEnd {
            count: self.emitted,
            status,
        }
    }

    pub fn into_report(self, status: TerminalStatus) -> RunReport {
        RunReport {
            status,
            records: self.emitted,
            duplicates: self.duplicates,
            rejected: self.rejected,
            warnings: self.warnings,
            pages: self.pages,
            retries: self.retries,
            elapsed_ms: self.started.elapsed().as_millis() as u64,
        }
    }
}
