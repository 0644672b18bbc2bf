//! Run configuration.
//!
//! Field names follow the camelCase option names of the settings file
//! (`maxItems`, `timeoutPerRequest`, ...); snake_case spellings are accepted
//! as aliases. Every field has a default so partial files are fine.

use crate::error::ConfigError;
use crate::export::OutputFormat;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;
use std::time::Duration;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://www.facebook.com";

/// Desktop browser user agent so the listing is served with standard markup.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// How continuation pages are requested once the first page returned a cursor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "style", rename_all = "lowercase")]
pub enum PaginationStyle {
    /// GET the listing URL again with the token in a query parameter.
    Query {
        #[serde(default = "default_cursor_param")]
        param: String,
    },
    /// Form POST to a GraphQL-style endpoint with `doc_id` and `variables`.
    Graphql {
        endpoint: String,
        #[serde(alias = "docId")]
        doc_id: String,
        #[serde(default)]
        variables: Map<String, Value>,
    },
}

impl Default for PaginationStyle {
    fn default() -> Self {
        PaginationStyle::Query {
            param: default_cursor_param(),
        }
    }
}

fn default_cursor_param() -> String {
    "cursor".to_string()
}

/// Options recognized for one extraction run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScrapeConfig {
    /// Cap on accepted records.
    #[serde(alias = "max_items")]
    pub max_items: usize,
    /// Per-attempt fetch deadline in milliseconds.
    #[serde(alias = "timeout_per_request")]
    pub timeout_per_request: u64,
    /// Retries per page after the first failed attempt.
    #[serde(alias = "retry_limit")]
    pub retry_limit: u32,
    #[serde(alias = "output_format")]
    pub output_format: OutputFormat,
    /// Consecutive pages admitting nothing new before the listing is
    /// treated as exhausted.
    #[serde(alias = "empty_page_threshold")]
    pub empty_page_threshold: u32,
    #[serde(alias = "backoff_base_ms")]
    pub backoff_base_ms: u64,
    #[serde(alias = "backoff_max_ms")]
    pub backoff_max_ms: u64,
    /// Minimum gap between consecutive requests.
    #[serde(alias = "request_delay_ms")]
    pub request_delay_ms: u64,
    #[serde(alias = "base_url")]
    pub base_url: String,
    #[serde(alias = "page_size")]
    pub page_size: u32,
    pub pagination: PaginationStyle,
    #[serde(alias = "user_agent")]
    pub user_agent: String,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            max_items: 250,
            timeout_per_request: 30_000,
            retry_limit: 3,
            output_format: OutputFormat::Json,
            empty_page_threshold: 3,
            backoff_base_ms: 500,
            backoff_max_ms: 30_000,
            request_delay_ms: 1_000,
            base_url: DEFAULT_BASE_URL.to_string(),
            page_size: 20,
            pagination: PaginationStyle::default(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl ScrapeConfig {
    /// Load a JSON settings object. Unknown keys are ignored.
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_items == 0 {
            return Err(ConfigError::ZeroLimit);
        }
        if self.timeout_per_request == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        self.base_url()?;
        Ok(())
    }

    pub fn base_url(&self) -> Result<Url, ConfigError> {
        let url = Url::parse(&self.base_url)
            .map_err(|_| ConfigError::BaseUrl(self.base_url.clone()))?;
        if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
            return Err(ConfigError::BaseUrl(self.base_url.clone()));
        }
        Ok(url)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_per_request)
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    /// Backoff before retry number `attempt + 1`: `base * 2^attempt`, capped,
    /// stretched to honor a server-supplied `Retry-After` (also capped).
    pub fn backoff_delay(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        let cap = Duration::from_millis(self.backoff_max_ms);
        let exp = Duration::from_millis(self.backoff_base_ms)
            .saturating_mul(2u32.saturating_pow(attempt.min(16)));
        exp.max(retry_after.unwrap_or_default()).min(cap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = ScrapeConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_items, 250);
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_partial_settings_camel_and_snake() {
        let config: ScrapeConfig = serde_json::from_str(
            r#"{"maxItems": 10, "retry_limit": 5, "outputFormat": "csv", "log_level": "DEBUG"}"#,
        )
        .unwrap();
        assert_eq!(config.max_items, 10);
        assert_eq!(config.retry_limit, 5);
        assert_eq!(config.output_format, OutputFormat::Csv);
        assert_eq!(config.empty_page_threshold, 3);
    }

    #[test]
    fn test_graphql_pagination_settings() {
        let config: ScrapeConfig = serde_json::from_str(
            r#"{"pagination": {"style": "graphql", "endpoint": "/api/graphql/", "docId": "42",
                "variables": {"scale": 1}}}"#,
        )
        .unwrap();
        match config.pagination {
            PaginationStyle::Graphql {
                endpoint,
                doc_id,
                variables,
            } => {
                assert_eq!(endpoint, "/api/graphql/");
                assert_eq!(doc_id, "42");
                assert_eq!(variables["scale"], 1);
            }
            other => panic!("unexpected pagination {other:?}"),
        }
    }

    #[test]
    fn test_validation_errors() {
        let config = ScrapeConfig {
            max_items: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::ZeroLimit)));

        let config = ScrapeConfig {
            timeout_per_request: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::ZeroTimeout)));

        let config = ScrapeConfig {
            base_url: "ftp://example.com".into(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::BaseUrl(_))));
    }

    #[test]
    fn test_backoff_is_exponential_and_capped() {
        let config = ScrapeConfig {
            backoff_base_ms: 100,
            backoff_max_ms: 1_000,
            ..Default::default()
        };
        assert_eq!(config.backoff_delay(0, None), Duration::from_millis(100));
        assert_eq!(config.backoff_delay(2, None), Duration::from_millis(400));
        assert_eq!(config.backoff_delay(10, None), Duration::from_millis(1_000));
        assert_eq!(
            config.backoff_delay(0, Some(Duration::from_millis(700))),
            Duration::from_millis(700)
        );
        assert_eq!(
            config.backoff_delay(0, Some(Duration::from_secs(60))),
            Duration::from_millis(1_000)
        );
    }
}
