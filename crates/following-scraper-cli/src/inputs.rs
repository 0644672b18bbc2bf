//! Batch target lists.

use anyhow::{Context, Result};
use following_scraper::OutputFormat;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One target with optional per-target overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetInput {
    pub url: String,
    #[serde(default, alias = "max_items", skip_serializing_if = "Option::is_none")]
    pub max_items: Option<usize>,
    #[serde(default, alias = "export_formats", skip_serializing_if = "Vec::is_empty")]
    pub export_formats: Vec<OutputFormat>,
}

impl TargetInput {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_items: None,
            export_formats: Vec::new(),
        }
    }
}

/// Read an inputs file: a JSON array of target objects (or bare strings),
/// or plain text with one target per line and `#` comments.
pub fn read_inputs(path: &Path) -> Result<Vec<TargetInput>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read inputs file {}", path.display()))?;
    parse_inputs(&text).with_context(|| format!("failed to parse inputs file {}", path.display()))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum InputEntry {
    Url(String),
    Target(TargetInput),
}

pub fn parse_inputs(text: &str) -> Result<Vec<TargetInput>> {
    if text.trim_start().starts_with('[') {
        let entries: Vec<InputEntry> = serde_json::from_str(text)?;
        return Ok(entries
            .into_iter()
            .map(|entry| match entry {
                InputEntry::Url(url) => TargetInput::new(url),
                InputEntry::Target(target) => target,
            })
            .collect());
    }

    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(TargetInput::new)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_inputs() {
        let inputs = parse_inputs(
            r#"[
                {"url": "https://www.facebook.com/UncutMagazine/following",
                 "maxItems": 2, "exportFormats": ["json", "csv"]},
                "example.profile"
            ]"#,
        )
        .unwrap();
        assert_eq!(inputs.len(), 2);
        assert_eq!(inputs[0].max_items, Some(2));
        assert_eq!(
            inputs[0].export_formats,
            vec![OutputFormat::Json, OutputFormat::Csv]
        );
        assert_eq!(inputs[1], TargetInput::new("example.profile"));
    }

    #[test]
    fn test_text_inputs_skip_comments() {
        let inputs = parse_inputs(
            "# profiles to scan\nhttps://www.facebook.com/UncutMagazine\n\n  100012345678900  \n",
        )
        .unwrap();
        let urls: Vec<&str> = inputs.iter().map(|i| i.url.as_str()).collect();
        assert_eq!(
            urls,
            vec!["https://www.facebook.com/UncutMagazine", "100012345678900"]
        );
    }

    #[test]
    fn test_malformed_json_is_error() {
        assert!(parse_inputs(r#"[{"maxItems": 2}]"#).is_err());
    }
}
