//! Target resolution: turn whatever the caller typed into the URL of the
//! profile's following listing.

use crate::error::ConfigError;
use regex::Regex;
use std::sync::LazyLock;
use url::Url;

static VANITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9._-]+$").expect("vanity regex is valid"));

const LISTING_SEGMENT: &str = "following";

/// True when `s` looks like a profile vanity name (no path, no spaces).
pub(crate) fn is_vanity(s: &str) -> bool {
    VANITY_RE.is_match(s) && !s.chars().all(|c| c.is_ascii_digit())
}

fn is_numeric_id(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}

/// Resolve a target reference to its following-listing URL.
///
/// Accepted forms:
/// - full profile URL (`https://www.facebook.com/UncutMagazine`)
/// - host-relative or scheme-less URL (`facebook.com/UncutMagazine`)
/// - `profile.php?id=N` URL
/// - numeric profile id
/// - vanity name
///
/// A trailing `following` segment is tolerated so listing URLs resolve to
/// themselves.
pub fn resolve_target(input: &str, base: &Url) -> Result<Url, ConfigError> {
    let raw = input.trim();
    let err = || ConfigError::Target(raw.to_string());
    if raw.is_empty() {
        return Err(err());
    }

    if is_numeric_id(raw) {
        return Ok(profile_php_listing(base, raw));
    }

    let url = if raw.starts_with("http://") || raw.starts_with("https://") {
        Url::parse(raw).map_err(|_| err())?
    } else if raw.starts_with('/') || raw.starts_with("profile.php") {
        base.join(raw).map_err(|_| err())?
    } else if let Some((host, _)) = raw.split_once('/') {
        if host.contains('.') {
            Url::parse(&format!("https://{raw}")).map_err(|_| err())?
        } else {
            base.join(raw).map_err(|_| err())?
        }
    } else if is_vanity(raw) {
        return vanity_listing(base, &[raw]).ok_or_else(err);
    } else {
        return Err(err());
    };

    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(err());
    }
    listing_for(&url).ok_or_else(err)
}

fn listing_for(url: &Url) -> Option<Url> {
    if url.path().ends_with("/profile.php") {
        let id = url
            .query_pairs()
            .find(|(k, _)| k == "id")
            .map(|(_, v)| v.into_owned())
            .filter(|v| is_numeric_id(v))?;
        return Some(profile_php_listing(url, &id));
    }

    let mut segments: Vec<&str> = url.path_segments()?.filter(|s| !s.is_empty()).collect();
    if segments.last() == Some(&LISTING_SEGMENT) {
        segments.pop();
    }
    if segments.is_empty() {
        return None;
    }
    vanity_listing(url, &segments)
}

fn profile_php_listing(origin: &Url, id: &str) -> Url {
    let mut url = origin.clone();
    url.set_path("/profile.php");
    url.set_fragment(None);
    url.set_query(None);
    url.query_pairs_mut()
        .append_pair("id", id)
        .append_pair("sk", LISTING_SEGMENT);
    url
}

fn vanity_listing(origin: &Url, segments: &[&str]) -> Option<Url> {
    let mut url = origin.clone();
    url.set_query(None);
    url.set_fragment(None);
    url.path_segments_mut()
        .ok()?
        .clear()
        .extend(segments)
        .push(LISTING_SEGMENT);
    Some(url)
}

/// Filesystem-safe name for a listing, used for output file names.
///
/// `/UncutMagazine/following` → `UncutMagazine`,
/// `/profile.php?id=42&sk=following` → `profile_42`.
pub fn target_slug(listing: &Url) -> String {
    if listing.path().ends_with("/profile.php") {
        if let Some((_, id)) = listing.query_pairs().find(|(k, _)| k == "id") {
            return format!("profile_{}", sanitize(&id));
        }
    }

    let segments: Vec<&str> = listing
        .path_segments()
        .map(|s| {
            s.filter(|seg| !seg.is_empty() && *seg != LISTING_SEGMENT)
                .collect()
        })
        .unwrap_or_default();
    let slug = sanitize(&segments.join("_"));
    if slug.is_empty() {
        "profile".to_string()
    } else {
        slug
    }
}

fn sanitize(s: &str) -> String {
    s.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://www.facebook.com").unwrap()
    }

    fn resolve(input: &str) -> String {
        resolve_target(input, &base()).unwrap().to_string()
    }

    #[test]
    fn test_profile_urls() {
        assert_eq!(
            resolve("https://www.facebook.com/UncutMagazine"),
            "https://www.facebook.com/UncutMagazine/following"
        );
        assert_eq!(
            resolve("https://www.facebook.com/UncutMagazine/following/?ref=x#top"),
            "https://www.facebook.com/UncutMagazine/following"
        );
        assert_eq!(
            resolve("facebook.com/example.profile"),
            "https://facebook.com/example.profile/following"
        );
    }

    #[test]
    fn test_profile_php_and_numeric_ids() {
        assert_eq!(
            resolve("https://www.facebook.com/profile.php?id=100064487118317"),
            "https://www.facebook.com/profile.php?id=100064487118317&sk=following"
        );
        assert_eq!(
            resolve("100012345678900"),
            "https://www.facebook.com/profile.php?id=100012345678900&sk=following"
        );
        assert!(resolve_target("https://www.facebook.com/profile.php", &base()).is_err());
    }

    #[test]
    fn test_vanity_names() {
        assert_eq!(
            resolve("  UncutMagazine "),
            "https://www.facebook.com/UncutMagazine/following"
        );
        assert!(is_vanity("example.profile"));
        assert!(!is_vanity("12345"));
        assert!(!is_vanity("two words"));
    }

    #[test]
    fn test_rejects_unusable_targets() {
        for bad in ["", "   ", "two words", "ftp://example.com/x", "https://www.facebook.com/"] {
            assert!(
                matches!(resolve_target(bad, &base()), Err(ConfigError::Target(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_slugs() {
        let listing = resolve_target("UncutMagazine", &base()).unwrap();
        assert_eq!(target_slug(&listing), "UncutMagazine");
        let listing = resolve_target("42", &base()).unwrap();
        assert_eq!(target_slug(&listing), "profile_42");
        let listing = resolve_target("https://www.facebook.com/pages/Some Page/9", &base()).unwrap();
        assert_eq!(target_slug(&listing), "pages_Some_20Page_9");
    }
}
