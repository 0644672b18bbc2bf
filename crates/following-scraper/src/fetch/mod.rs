//! Page fetching.
//!
//! A [`Fetcher`] turns a cursor into one raw page fragment. It performs the
//! network call and classifies failures; it never retries, and never touches
//! session state beyond attaching the caller-supplied [`SessionContext`].

pub mod http;
pub mod rate_limiter;
pub mod session;

pub use http::HttpFetcher;
pub use rate_limiter::RateLimiter;
pub use session::SessionContext;

use crate::cursor::Cursor;
use crate::error::FetchFailure;
use async_trait::async_trait;
use std::time::Duration;

/// One fetched scroll batch plus transport metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct PageFragment {
    /// Markup and/or embedded data, as served.
    pub body: String,
    /// URL after redirects.
    pub final_url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub elapsed: Duration,
}

impl PageFragment {
    /// Fragment with a 200 status and no transport details; handy for
    /// feeding the extractor directly.
    pub fn from_body(url: &str, body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            final_url: url.to_string(),
            status: 200,
            content_type: None,
            elapsed: Duration::ZERO,
        }
    }

    pub fn is_json(&self) -> bool {
        self.content_type
            .as_deref()
            .map(|ct| ct.contains("json") || ct.contains("javascript"))
            .unwrap_or(false)
    }
}

/// Source of listing pages.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch the page addressed by `cursor` ([`Cursor::Initial`] for the
    /// first page).
    async fn fetch(&self, cursor: &Cursor) -> Result<PageFragment, FetchFailure>;
}
