//! reqwest-backed fetcher for the following listing.

use super::rate_limiter::RateLimiter;
use super::session::SessionContext;
use super::{Fetcher, PageFragment};
use crate::config::{PaginationStyle, ScrapeConfig};
use crate::cursor::Cursor;
use crate::error::{AccessError, ConfigError, FetchError, FetchFailure};
use async_trait::async_trait;
use reqwest::header::{ACCEPT_LANGUAGE, CONTENT_TYPE, COOKIE, RETRY_AFTER};
use reqwest::{Client, RequestBuilder};
use serde_json::{Map, Value};
use std::time::{Duration, Instant};
use tracing::debug;
use url::Url;

/// Markers that show a page carries listing content even when a login form
/// is also present (logged-out visitors get both on public profiles).
const LISTING_MARKERS: &[&str] = &["follow_list_item", "following-item", "\"edges\""];

/// Resolved form of [`PaginationStyle`].
#[derive(Debug, Clone)]
enum ContinuationRequest {
    Query {
        param: String,
    },
    Graphql {
        endpoint: Url,
        doc_id: String,
        variables: Map<String, Value>,
    },
}

/// Fetches listing pages over HTTP, carrying the caller's session context.
pub struct HttpFetcher {
    client: Client,
    listing_url: Url,
    continuation: ContinuationRequest,
    page_size: u32,
    session: SessionContext,
    rate_limiter: RateLimiter,
    timeout: Duration,
}

impl HttpFetcher {
    /// Build a fetcher for `listing_url` (see [`crate::target::resolve_target`]).
    pub fn new(
        listing_url: Url,
        config: &ScrapeConfig,
        session: SessionContext,
    ) -> Result<Self, ConfigError> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ConfigError::Client(e.to_string()))?;

        let continuation = match &config.pagination {
            PaginationStyle::Query { param } => ContinuationRequest::Query {
                param: param.clone(),
            },
            PaginationStyle::Graphql {
                endpoint,
                doc_id,
                variables,
            } => ContinuationRequest::Graphql {
                endpoint: listing_url
                    .join(endpoint)
                    .map_err(|_| ConfigError::BaseUrl(endpoint.clone()))?,
                doc_id: doc_id.clone(),
                variables: variables.clone(),
            },
        };

        Ok(Self {
            client,
            listing_url,
            continuation,
            page_size: config.page_size,
            session,
            rate_limiter: RateLimiter::new(config.request_delay()),
            timeout: config.request_timeout(),
        })
    }

    pub fn listing_url(&self) -> &Url {
        &self.listing_url
    }

    fn request(&self, cursor: &Cursor) -> RequestBuilder {
        let builder = match (cursor, &self.continuation) {
            (Cursor::Initial, _) => self.client.get(self.listing_url.clone()),
            (Cursor::Token(token), ContinuationRequest::Query { param }) => {
                self.client.get(self.continuation_url(token, param))
            }
            (
                Cursor::Token(token),
                ContinuationRequest::Graphql {
                    endpoint,
                    doc_id,
                    variables,
                },
            ) => {
                let mut vars = variables.clone();
                vars.insert("cursor".into(), Value::String(token.clone()));
                vars.insert("count".into(), Value::from(self.page_size));

                let mut form = self.session.sorted_form_tokens();
                form.push(("doc_id".into(), doc_id.clone()));
                form.push(("variables".into(), Value::Object(vars).to_string()));
                self.client.post(endpoint.clone()).form(&form)
            }
        };
        self.with_session(builder)
    }

    /// Listing URL for a continuation token. Tokens that are themselves links
    /// (a `rel="next"` href) are followed as-is.
    fn continuation_url(&self, token: &str, param: &str) -> Url {
        if token.starts_with("http://") || token.starts_with("https://") || token.starts_with('/')
        {
            if let Ok(url) = self.listing_url.join(token) {
                return url;
            }
        }

        let mut url = self.listing_url.clone();
        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(k, _)| k != param)
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        url.query_pairs_mut()
            .clear()
            .extend_pairs(kept)
            .append_pair(param, token);
        url
    }

    fn with_session(&self, mut builder: RequestBuilder) -> RequestBuilder {
        builder = builder.header(ACCEPT_LANGUAGE, "en-US,en;q=0.8");
        if let Some(cookie) = self.session.cookie_header() {
            builder = builder.header(COOKIE, cookie);
        }
        for (name, value) in &self.session.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder
    }

    fn transport_error(&self, err: reqwest::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout(self.timeout)
        } else {
            FetchError::Network(err.to_string())
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, cursor: &Cursor) -> Result<PageFragment, FetchFailure> {
        let request = self.request(cursor);
        self.rate_limiter.acquire().await;

        let started = Instant::now();
        let response = request.send().await.map_err(|e| self.transport_error(e))?;

        let status = response.status().as_u16();
        let final_url = response.url().clone();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_retry_after);

        classify_status(status, retry_after)?;

        let body = response.text().await.map_err(|e| self.transport_error(e))?;
        detect_login_wall(&final_url, &body)?;

        let elapsed = started.elapsed();
        debug!(
            cursor = %cursor,
            status,
            bytes = body.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "fetched listing page"
        );

        Ok(PageFragment {
            body,
            final_url: final_url.to_string(),
            status,
            content_type,
            elapsed,
        })
    }
}

/// Map an HTTP status onto the fetch taxonomy.
fn classify_status(status: u16, retry_after: Option<Duration>) -> Result<(), FetchFailure> {
    match status {
        200..=299 => Ok(()),
        401 => Err(AccessError::new(Some(status), "authentication required").into()),
        403 => Err(AccessError::new(Some(status), "access forbidden").into()),
        404 | 410 => Err(AccessError::new(Some(status), "profile or listing not found").into()),
        429 => Err(FetchError::RateLimited {
            status,
            retry_after,
        }
        .into()),
        503 if retry_after.is_some() => Err(FetchError::RateLimited {
            status,
            retry_after,
        }
        .into()),
        _ => Err(FetchError::Status(status).into()),
    }
}

/// A successful response can still be a login or checkpoint interstitial.
fn detect_login_wall(final_url: &Url, body: &str) -> Result<(), AccessError> {
    let path = final_url.path();
    if path.starts_with("/login") || path.starts_with("/checkpoint") {
        return Err(AccessError::new(None, format!("redirected to {path}")));
    }
    if body.contains("id=\"login_form\"") && !LISTING_MARKERS.iter().any(|m| body.contains(m)) {
        return Err(AccessError::new(None, "listing is behind a login wall"));
    }
    Ok(())
}

/// `Retry-After` in delta-seconds form. HTTP-date values are ignored.
fn parse_retry_after(value: &str) -> Option<Duration> {
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}
