//! Caller-supplied request context for authenticated listing fetches.
//!
//! A `SessionContext` holds cookies, extra headers and form tokens obtained
//! outside this crate (a browser export, a login helper). The fetcher
//! attaches it to every request; it never refreshes or validates it.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Cookies, headers and form tokens attached to every listing request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionContext {
    /// Session cookies (name -> value).
    pub cookies: HashMap<String, String>,
    /// Extra request headers (header-name -> value).
    pub headers: HashMap<String, String>,
    /// Form fields sent with POST continuations (e.g. `fb_dtsg`, `lsd`).
    #[serde(alias = "formTokens")]
    pub form_tokens: HashMap<String, String>,
}

impl SessionContext {
    /// Load a context from a JSON file with optional `cookies`, `headers`
    /// and `form_tokens` objects.
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

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty() && self.headers.is_empty() && self.form_tokens.is_empty()
    }

    /// Format cookies as a `Cookie` header value, sorted by name so the
    /// header is deterministic.
    pub fn cookie_header(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        let mut pairs: Vec<_> = self.cookies.iter().collect();
        pairs.sort_by_key(|(k, _)| k.as_str());
        Some(
            pairs
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    pub fn add_cookie(&mut self, name: &str, value: &str) {
        self.cookies.insert(name.to_string(), value.to_string());
    }

    pub fn add_header(&mut self, name: &str, value: &str) {
        self.headers.insert(name.to_string(), value.to_string());
    }

    pub fn add_form_token(&mut self, name: &str, value: &str) {
        self.form_tokens.insert(name.to_string(), value.to_string());
    }

    /// Form tokens sorted by name.
    pub fn sorted_form_tokens(&self) -> Vec<(String, String)> {
        let mut tokens: Vec<_> = self
            .form_tokens
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        tokens.sort();
        tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cookie_header_format() {
        let mut session = SessionContext::default();
        assert_eq!(session.cookie_header(), None);

        session.add_cookie("xs", "abc123");
        session.add_cookie("c_user", "42");
        // Sorted by name: c_user comes before xs
        assert_eq!(session.cookie_header().unwrap(), "c_user=42; xs=abc123");
    }

    #[test]
    fn test_load_from_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(
            &path,
            r#"{"cookies": {"c_user": "42"}, "formTokens": {"fb_dtsg": "tok"}}"#,
        )
        .unwrap();

        let session = SessionContext::from_json_file(&path).unwrap();
        assert_eq!(session.cookies.get("c_user").unwrap(), "42");
        assert_eq!(session.form_tokens.get("fb_dtsg").unwrap(), "tok");
        assert!(session.headers.is_empty());
        assert!(!session.is_empty());
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let err = SessionContext::from_json_file(Path::new("/nonexistent/session.json"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
