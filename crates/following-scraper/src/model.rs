//! Record types flowing through the pipeline and the end-of-stream signal.

use crate::error::AccessError;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Canonical record for one followed profile.
///
/// `username` and `profile_details` are omitted from the serialized form
/// when empty; every other field is always present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowedProfile {
    pub id: String,
    /// Absolute image URL or empty string.
    pub image: String,
    pub title: String,
    pub subtitle_text: String,
    /// Canonical absolute profile link.
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Free-form metadata; never holds a fixed field name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub profile_details: BTreeMap<String, Value>,
}

impl FollowedProfile {
    /// Field names that `profile_details` may never shadow.
    pub const FIXED_FIELDS: &'static [&'static str] = &[
        "id",
        "image",
        "title",
        "subtitle_text",
        "url",
        "username",
        "profile_details",
    ];
}

/// Which extraction strategy produced a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CandidateSource {
    EmbeddedData,
    Markup,
}

impl CandidateSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            CandidateSource::EmbeddedData => "embedded-data",
            CandidateSource::Markup => "markup",
        }
    }
}

/// Loosely-typed bag of fields recovered from a page, before validation.
#[derive(Debug, Clone, PartialEq)]
pub struct RawCandidate {
    pub source: CandidateSource,
    pub fields: Map<String, Value>,
}

impl RawCandidate {
    pub fn new(source: CandidateSource) -> Self {
        Self {
            source,
            fields: Map::new(),
        }
    }

    pub fn from_map(source: CandidateSource, fields: Map<String, Value>) -> Self {
        Self { source, fields }
    }

    /// Builder-style insert, mostly for tests and the markup strategy.
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    pub fn insert(&mut self, key: &str, value: impl Into<Value>) {
        self.fields.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }
}

/// Why a run stopped before the listing or the limit was reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbortReason {
    Access(AccessError),
    FetchExhausted { attempts: u32, last_error: String },
    Cancelled,
    Sink(String),
}

impl AbortReason {
    /// Short machine-readable reason used in `aborted:<reason>`.
    pub fn code(&self) -> &'static str {
        match self {
            AbortReason::Access(_) => "access",
            AbortReason::FetchExhausted { .. } => "fetchExhausted",
            AbortReason::Cancelled => "cancelled",
            AbortReason::Sink(_) => "sink",
        }
    }

    pub fn detail(&self) -> String {
        match self {
            AbortReason::Access(e) => e.to_string(),
            AbortReason::FetchExhausted {
                attempts,
                last_error,
            } => format!("gave up after {attempts} attempts: {last_error}"),
            AbortReason::Cancelled => "cancelled by caller".to_string(),
            AbortReason::Sink(e) => format!("sink failed: {e}"),
        }
    }
}

/// Terminal state of one extraction run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalStatus {
    /// The listing ended (terminal cursor, stall, or empty-page threshold).
    Completed,
    /// `maxItems` records were emitted.
    LimitReached,
    Aborted(AbortReason),
}

impl fmt::Display for TerminalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminalStatus::Completed => f.write_str("completed"),
            TerminalStatus::LimitReached => f.write_str("limitReached"),
            TerminalStatus::Aborted(reason) => write!(f, "aborted:{}", reason.code()),
        }
    }
}

impl Serialize for TerminalStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// End-of-stream signal handed to the sink after the last record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamEnd {
    pub count: usize,
    pub status: TerminalStatus,
}

/// Post-run accounting returned by the controller.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub status: TerminalStatus,
    pub records: usize,
    pub duplicates: usize,
    pub rejected: usize,
    pub warnings: usize,
    pub pages: u32,
    pub retries: u32,
    pub elapsed_ms: u64,
}

impl RunReport {
    /// Process exit code for a single run: 0 on success (any count), 1 when
    /// the run aborted before emitting anything, 2 when it aborted after a
    /// partial record stream.
    pub fn exit_code(&self) -> i32 {
        match (&self.status, self.records) {
            (TerminalStatus::Aborted(_), 0) => 1,
            (TerminalStatus::Aborted(_), _) => 2,
            _ => 0,
        }
    }
}
