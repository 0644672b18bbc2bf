//! Mapping of raw candidates onto [`FollowedProfile`].
//!
//! Raw candidates come from two very different sources (embedded JSON nodes
//! and scraped markup), so every field is looked up under a list of known
//! spellings, first present wins. Anything unrecognized is kept verbatim in
//! `profile_details`.

use crate::error::NormalizationError;
use crate::model::{FollowedProfile, RawCandidate};
use crate::target::is_vanity;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use url::Url;

const ID_KEYS: &[&str] = &["id", "profile_id", "profileId", "data-profile-id", "userID"];
const TITLE_KEYS: &[&str] = &["title", "name", "text"];
const SUBTITLE_KEYS: &[&str] = &[
    "subtitle_text",
    "subtitle",
    "subtitleText",
    "snippet",
    "aria-label",
];
const IMAGE_KEYS: &[&str] = &[
    "image",
    "profile_picture",
    "profilePicture",
    "picture",
    "photo",
    "src",
];
const URL_KEYS: &[&str] = &["url", "profile_url", "profileUrl", "link", "href"];
const USERNAME_KEYS: &[&str] = &["username", "vanity"];

/// Wrapper keys consumed by the lookups above.
const NODE_KEY: &str = "node";
const DETAILS_KEY: &str = "profile_details";

/// Keys whose object values are unwrapped to a string.
const WRAPPER_KEYS: &[&str] = &["text", "uri", "url", "name"];

/// Prefix of the title-derived fallback key.
const TITLE_KEY_PREFIX: &str = "title:";

#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    base_url: Option<Url>,
}

impl Normalizer {
    /// `base_url` resolves relative links and synthesizes missing profile
    /// URLs. Without it, relative links are rejected.
    pub fn new(base_url: Option<Url>) -> Self {
        Self { base_url }
    }

    pub fn normalize(&self, candidate: &RawCandidate) -> Result<FollowedProfile, NormalizationError> {
        let fields = &candidate.fields;

        let title = first_text(fields, TITLE_KEYS);
        let url = first_text(fields, URL_KEYS)
            .map(|raw| self.resolve_url(&raw).map(canonicalize))
            .transpose()?;

        // A list item often wraps the profile in a nested `node`; that
        // node's id names the profile, the wrapper's id names the item.
        let explicit_id = nested_node_id(fields).or_else(|| first_text(fields, ID_KEYS));
        let id = match (explicit_id, url.as_ref().and_then(key_from_url), &title) {
            (Some(id), _, _) => id,
            (None, Some(key), _) => key,
            (None, None, Some(title)) => format!("{TITLE_KEY_PREFIX}{}", title.to_lowercase()),
            (None, None, None) => return Err(NormalizationError::MissingKey),
        };
        let title = title.ok_or(NormalizationError::MissingTitle)?;

        let username = first_text(fields, USERNAME_KEYS)
            .or_else(|| url.as_ref().and_then(username_from_url));

        let url = match url {
            Some(url) => url,
            None => self
                .synthesize_url(&id, username.as_deref())
                .ok_or(NormalizationError::MissingUrl)?,
        };

        let image = first_text(fields, IMAGE_KEYS)
            .and_then(|raw| self.resolve_url(&raw).ok())
            .map(String::from)
            .unwrap_or_default();

        Ok(FollowedProfile {
            id,
            image,
            title,
            subtitle_text: first_text(fields, SUBTITLE_KEYS).unwrap_or_default(),
            url: url_string(&url),
            username,
            profile_details: collect_details(fields),
        })
    }

    fn resolve_url(&self, raw: &str) -> Result<Url, NormalizationError> {
        let invalid = |reason: String| NormalizationError::InvalidUrl {
            value: raw.to_string(),
            reason,
        };

        let parsed = match raw.strip_prefix("//") {
            Some(rest) => Url::parse(&format!("https://{rest}")),
            None => match Url::parse(raw) {
                Err(url::ParseError::RelativeUrlWithoutBase) => match &self.base_url {
                    Some(base) => base.join(raw),
                    None => return Err(invalid("relative URL without a base".into())),
                },
                other => other,
            },
        };
        let url = parsed.map_err(|e| invalid(e.to_string()))?;

        if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
            return Err(invalid(format!("unsupported scheme {:?}", url.scheme())));
        }
        Ok(url)
    }

    fn synthesize_url(&self, id: &str, username: Option<&str>) -> Option<Url> {
        let base = self.base_url.as_ref()?;
        if id.chars().all(|c| c.is_ascii_digit()) {
            let mut url = base.join("/profile.php").ok()?;
            url.query_pairs_mut().append_pair("id", id);
            return Some(url);
        }
        let vanity = username.filter(|u| is_vanity(u)).or_else(|| {
            (!id.starts_with(TITLE_KEY_PREFIX) && is_vanity(id)).then_some(id)
        })?;
        base.join(&format!("/{vanity}")).ok()
    }
}

/// Best-effort string form of a raw value.
fn text_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Object(map) => WRAPPER_KEYS
            .iter()
            .find_map(|k| map.get(*k).and_then(text_value)),
        _ => None,
    }
}

fn first_text(fields: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|k| fields.get(*k).and_then(text_value))
}

fn nested_node_id(fields: &Map<String, Value>) -> Option<String> {
    fields
        .get(NODE_KEY)
        .and_then(Value::as_object)
        .and_then(|node| node.get("id"))
        .and_then(text_value)
}

fn is_profile_php(url: &Url) -> bool {
    url.path().ends_with("/profile.php")
}

fn profile_php_id(url: &Url) -> Option<String> {
    url.query_pairs()
        .find(|(k, _)| k == "id")
        .map(|(_, v)| v.into_owned())
        .filter(|v| !v.is_empty())
}

/// Drop the fragment, tracking parameters and trailing slashes. The only
/// query parameter that identifies a profile is `id` on `profile.php`.
fn canonicalize(mut url: Url) -> Url {
    url.set_fragment(None);
    let id = is_profile_php(&url).then(|| profile_php_id(&url)).flatten();
    url.set_query(None);
    if let Some(id) = id {
        url.query_pairs_mut().append_pair("id", &id);
    }
    let path = url.path().trim_end_matches('/').to_string();
    url.set_path(&path);
    url
}

/// Serialized form of a canonical URL; the root path keeps no slash either.
fn url_string(url: &Url) -> String {
    let mut s = url.to_string();
    if url.query().is_none() && s.ends_with('/') {
        s.pop();
    }
    s
}

fn last_segment(url: &Url) -> Option<&str> {
    url.path_segments()?.filter(|s| !s.is_empty()).last()
}

/// Identifying key carried by a canonical profile URL.
fn key_from_url(url: &Url) -> Option<String> {
    if is_profile_php(url) {
        return profile_php_id(url);
    }
    last_segment(url).map(str::to_string)
}

fn username_from_url(url: &Url) -> Option<String> {
    if is_profile_php(url) {
        return None;
    }
    last_segment(url)
        .filter(|s| !s.chars().all(|c| c.is_ascii_digit()))
        .map(str::to_string)
}

fn is_consumed(key: &str) -> bool {
    key == NODE_KEY
        || key == DETAILS_KEY
        || [
            ID_KEYS,
            TITLE_KEYS,
            SUBTITLE_KEYS,
            IMAGE_KEYS,
            URL_KEYS,
            USERNAME_KEYS,
        ]
        .iter()
        .any(|keys| keys.contains(&key))
}

/// Unrecognized raw keys plus any pre-built `profile_details` object.
fn collect_details(fields: &Map<String, Value>) -> BTreeMap<String, Value> {
    let mut details: BTreeMap<String, Value> = fields
        .iter()
        .filter(|(k, _)| !is_consumed(k) && !FollowedProfile::FIXED_FIELDS.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    if let Some(Value::Object(extra)) = fields.get(DETAILS_KEY) {
        for (k, v) in extra {
            if !FollowedProfile::FIXED_FIELDS.contains(&k.as_str()) {
                details.entry(k.clone()).or_insert_with(|| v.clone());
            }
        }
    }
    details
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CandidateSource;
    use serde_json::json;

    fn normalizer() -> Normalizer {
        Normalizer::new(Some(Url::parse("https://www.facebook.com").unwrap()))
    }

    fn candidate(value: Value) -> RawCandidate {
        match value {
            Value::Object(map) => RawCandidate::from_map(CandidateSource::EmbeddedData, map),
            _ => panic!("candidate must be an object"),
        }
    }

    #[test]
    fn test_markup_candidate() {
        let raw = RawCandidate::new(CandidateSource::Markup)
            .with("profile_id", "100012345678900")
            .with("href", "https://www.facebook.com/example.profile/?ref=fr_tab#x")
            .with("image", "https://example.com/photo.jpg")
            .with("title", "  Example Profile ")
            .with("subtitle_text", "Music · Artist")
            .with("data_gt", "{\"k\":1}");

        let p = normalizer().normalize(&raw).unwrap();
        assert_eq!(p.id, "100012345678900");
        assert_eq!(p.title, "Example Profile");
        assert_eq!(p.url, "https://www.facebook.com/example.profile");
        assert_eq!(p.username.as_deref(), Some("example.profile"));
        assert_eq!(p.subtitle_text, "Music · Artist");
        assert_eq!(p.profile_details["data_gt"], "{\"k\":1}");
    }

    #[test]
    fn test_embedded_node_shape() {
        let raw = candidate(json!({
            "id": "col:1",
            "title": {"text": "Uncut Magazine"},
            "url": "https://www.facebook.com/UncutMagazine",
            "image": {"uri": "https://scontent.example/462614990_n.jpg?stp=dst&_nc_cat=1"},
            "subtitle_text": {"text": ""},
            "node": {"id": "100064487118317"},
            "__typename": "AppCollectionItem"
        }));
        let p = normalizer().normalize(&raw).unwrap();
        assert_eq!(p.id, "100064487118317");
        assert_eq!(p.title, "Uncut Magazine");
        assert_eq!(p.subtitle_text, "");
        assert_eq!(
            p.image,
            "https://scontent.example/462614990_n.jpg?stp=dst&_nc_cat=1"
        );
        assert_eq!(p.profile_details.len(), 1);
        assert_eq!(p.profile_details["__typename"], "AppCollectionItem");
    }

    #[test]
    fn test_id_derived_from_url() {
        let raw = RawCandidate::new(CandidateSource::Markup)
            .with("title", "Some Band")
            .with("href", "/profile.php?id=42&ref=xyz");
        let p = normalizer().normalize(&raw).unwrap();
        assert_eq!(p.id, "42");
        assert_eq!(p.url, "https://www.facebook.com/profile.php?id=42");
        assert_eq!(p.username, None);

        let raw = RawCandidate::new(CandidateSource::Markup)
            .with("title", "Uncut")
            .with("href", "//www.facebook.com/UncutMagazine/");
        let p = normalizer().normalize(&raw).unwrap();
        assert_eq!(p.id, "UncutMagazine");
        assert_eq!(p.url, "https://www.facebook.com/UncutMagazine");
    }

    #[test]
    fn test_fallback_key_is_stable() {
        let raw = || {
            RawCandidate::new(CandidateSource::Markup)
                .with("title", "Mystery Page")
                .with("href", "https://www.facebook.com/")
        };
        let a = normalizer().normalize(&raw()).unwrap();
        let b = normalizer().normalize(&raw()).unwrap();
        assert_eq!(a.id, "title:mystery page");
        assert_eq!(a.id, b.id);
        assert_eq!(a.url, "https://www.facebook.com");
    }

    #[test]
    fn test_url_synthesized_from_id() {
        let raw = candidate(json!({"id": 100064487118317u64, "name": "Uncut Magazine"}));
        let p = normalizer().normalize(&raw).unwrap();
        assert_eq!(p.url, "https://www.facebook.com/profile.php?id=100064487118317");

        let raw = candidate(json!({"id": "x1", "name": "A", "username": "some.page"}));
        let p = normalizer().normalize(&raw).unwrap();
        assert_eq!(p.url, "https://www.facebook.com/some.page");
    }

    #[test]
    fn test_rejections() {
        let n = normalizer();
        assert_eq!(
            n.normalize(&candidate(json!({"subtitle": "x"}))),
            Err(NormalizationError::MissingKey)
        );
        assert_eq!(
            n.normalize(&candidate(json!({"id": "42", "url": "https://www.facebook.com/a"}))),
            Err(NormalizationError::MissingTitle)
        );
        assert!(matches!(
            n.normalize(&candidate(json!({"title": "A", "url": "javascript:void(0)"}))),
            Err(NormalizationError::InvalidUrl { .. })
        ));

        let bare = Normalizer::new(None);
        assert_eq!(
            bare.normalize(&candidate(json!({"id": "42", "title": "A"}))),
            Err(NormalizationError::MissingUrl)
        );
        assert!(matches!(
            bare.normalize(&candidate(json!({"title": "A", "href": "/a"}))),
            Err(NormalizationError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_invalid_image_becomes_empty() {
        let raw = candidate(json!({
            "id": "1", "title": "A", "url": "https://www.facebook.com/a",
            "image": "data:image/png;base64,AAAA"
        }));
        assert_eq!(normalizer().normalize(&raw).unwrap().image, "");
    }

    #[test]
    fn test_details_never_shadow_fixed_fields() {
        let raw = candidate(json!({
            "id": "1", "title": "A", "url": "https://www.facebook.com/a",
            "profile_details": {"url": "https://evil.example", "category": "Musician"},
            "followers": 12
        }));
        let p = normalizer().normalize(&raw).unwrap();
        let keys: Vec<&str> = p.profile_details.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["category", "followers"]);
    }

    #[test]
    fn test_normalization_is_deterministic() {
        let raw = candidate(json!({
            "node": {"id": "7"}, "title": "Z", "url": "https://www.facebook.com/z?x=1",
            "b": 2, "a": {"nested": true}
        }));
        let n = normalizer();
        let first = serde_json::to_string(&n.normalize(&raw).unwrap()).unwrap();
        let second = serde_json::to_string(&n.normalize(&raw.clone()).unwrap()).unwrap();
        assert_eq!(first, second);
        assert!(first.contains(r#""profile_details":{"a":{"nested":true},"b":2}"#));
    }
}
