//! Pagination-driven extraction of a profile's "following" list.
//!
//! The pipeline is a sequential loop owned by [`PaginationController`]:
//! a [`Fetcher`] retrieves one scroll batch for the current [`Cursor`], the
//! [`Extractor`] recovers raw candidates plus a continuation from the
//! fragment, the [`Normalizer`] maps candidates onto [`FollowedProfile`], and
//! the session's deduplicator drops repeats caused by overlapping scroll
//! windows. Accepted records stream to a [`RecordSink`] as they are admitted.

pub mod config;
pub mod controller;
pub mod cursor;
pub mod dedup;
pub mod error;
pub mod export;
pub mod extract;
pub mod fetch;
pub mod model;
pub mod normalize;
pub mod session;
pub mod target;

pub use config::{PaginationStyle, ScrapeConfig};
pub use controller::{CancelFlag, PaginationController};
pub use cursor::{Continuation, Cursor};
pub use dedup::{Admission, Deduplicator};
pub use error::{
    AccessError, ConfigError, ExtractWarning, FetchError, FetchFailure, NormalizationError,
    SinkError,
};
pub use export::{MemorySink, MultiSink, OutputFormat, RecordSink};
pub use extract::{Extraction, Extractor, PageExtractor};
pub use fetch::{Fetcher, HttpFetcher, PageFragment, SessionContext};
pub use model::{
    AbortReason, CandidateSource, FollowedProfile, RawCandidate, RunReport, StreamEnd,
    TerminalStatus,
};
pub use normalize::Normalizer;
pub use session::ExtractionSession;
