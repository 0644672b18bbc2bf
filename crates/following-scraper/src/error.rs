//! Error and warning taxonomy for the extraction pipeline.
//!
//! Only two outcomes end a run early: an [`AccessError`] (immediately) and a
//! [`FetchError`] that survives every retry. Everything else is recorded on
//! the session and the run carries on.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Transient failure while fetching a page. Retried with backoff.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("unexpected HTTP status {0}")]
    Status(u16),

    #[error("rate limited (HTTP {status})")]
    RateLimited {
        status: u16,
        retry_after: Option<Duration>,
    },
}

impl FetchError {
    /// Server-requested wait before the next attempt, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            FetchError::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

/// The listing cannot be read with the supplied session (private, hidden,
/// removed, or behind a login wall). Never retried.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("listing not accessible: {reason}")]
pub struct AccessError {
    /// HTTP status that triggered the classification, if any.
    pub status: Option<u16>,
    pub reason: String,
}

impl AccessError {
    pub fn new(status: Option<u16>, reason: impl Into<String>) -> Self {
        Self {
            status,
            reason: reason.into(),
        }
    }
}

/// Result type of a single fetch attempt.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchFailure {
    #[error(transparent)]
    Transient(#[from] FetchError),

    #[error(transparent)]
    Access(#[from] AccessError),
}

/// Recoverable page-level anomaly reported by the extractor.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum ExtractWarning {
    /// A strategy understood the page but found no items, yet the listing
    /// claims to continue.
    #[error("page yielded no candidates but the listing continues")]
    EmptyPage,

    /// No strategy recognized the page at all.
    #[error("no extraction strategy recognized the page layout")]
    LayoutDrift,
}

/// A raw candidate that could not be mapped onto the canonical schema.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NormalizationError {
    #[error("candidate has neither an identifying key nor a title")]
    MissingKey,

    #[error("candidate has no display name")]
    MissingTitle,

    #[error("candidate has no usable profile URL")]
    MissingUrl,

    #[error("invalid URL {value:?}: {reason}")]
    InvalidUrl { value: String, reason: String },
}

/// Failure writing to a record sink.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON encoding error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("XML error: {0}")]
    Xml(String),

    #[error("XLSX error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("sink already finished")]
    Finished,
}

/// Invalid configuration, target or settings file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("maxItems must be at least 1")]
    ZeroLimit,

    #[error("timeoutPerRequest must be greater than zero")]
    ZeroTimeout,

    #[error("unknown output format {0:?} (expected json, jsonl, csv, html, xml or xlsx)")]
    UnknownFormat(String),

    #[error("invalid base URL {0:?}")]
    BaseUrl(String),

    #[error("cannot resolve target {0:?} to a profile listing")]
    Target(String),

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to build HTTP client: {0}")]
    Client(String),
}
