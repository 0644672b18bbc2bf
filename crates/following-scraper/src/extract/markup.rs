//! Structural markup traversal keyed on known card signatures, with an
//! anchor heuristic for layouts that carry no recognizable cards.

use super::{clean_text, ExtractStrategy, StrategyOutput};
use crate::fetch::PageFragment;
use crate::model::{CandidateSource, RawCandidate};
use scraper::{ElementRef, Html, Selector};

/// Elements that wrap one followed profile.
const CARD_SIGNATURES: &str =
    r#"[data-testid="follow_list_item"], .following-item, [data-profile-id]"#;

/// Hrefs that plausibly point at a profile.
const PROFILE_HREF_PATTERNS: &[&str] = &[
    "/friends",
    "/friends_mutual",
    "/following",
    "/profile.php",
    "facebook.com",
];

/// Anchor texts that belong to site navigation rather than the listing.
const NAVIGATION_WORDS: &[&str] = &[
    "home",
    "create",
    "marketplace",
    "groups",
    "friends",
    "watch",
    "menu",
    "log in",
    "log out",
    "privacy",
    "terms",
];

/// Last path segments of listing pages, which link to lists rather than profiles.
const LISTING_SEGMENTS: &[&str] = &["following", "friends", "friends_mutual"];

/// Anchor attributes passed through verbatim into the candidate.
const PASSTHROUGH_ATTRS: &[(&str, &str)] = &[
    ("data-gt", "data_gt"),
    ("data-hovercard", "data_hovercard"),
];

/// Reads profile cards out of rendered markup.
#[derive(Debug, Default)]
pub struct MarkupStrategy;

struct Selectors {
    cards: Selector,
    anchor: Selector,
    image: Selector,
    title: Selector,
    subtitle: Selector,
    next_cursor: Selector,
    cursor: Selector,
    rel_next: Selector,
}

impl Selectors {
    fn parse() -> Option<Self> {
        Some(Self {
            cards: sel(CARD_SIGNATURES)?,
            anchor: sel("a[href]")?,
            image: sel("img")?,
            title: sel(".following-title")?,
            subtitle: sel(".following-subtitle")?,
            next_cursor: sel("[data-next-cursor]")?,
            cursor: sel("[data-cursor]")?,
            rel_next: sel(r#"link[rel="next"][href], a[rel="next"][href]"#)?,
        })
    }
}

fn sel(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

impl ExtractStrategy for MarkupStrategy {
    fn name(&self) -> &'static str {
        "markup"
    }

    fn apply(&self, fragment: &PageFragment) -> Option<StrategyOutput> {
        let selectors = Selectors::parse()?;
        let document = Html::parse_document(&fragment.body);

        let mut candidates: Vec<RawCandidate> = document
            .select(&selectors.cards)
            .filter(|card| !has_card_ancestor(card, &selectors.cards))
            .map(|card| card_candidate(card, &selectors))
            .collect();

        if candidates.is_empty() {
            candidates = heuristic_candidates(&document, &selectors);
        }

        let next_token = next_token(&document, &selectors);
        if candidates.is_empty() && next_token.is_none() {
            return None;
        }

        Some(StrategyOutput {
            candidates,
            next_token,
            has_more: None,
        })
    }
}

fn has_card_ancestor(el: &ElementRef, cards: &Selector) -> bool {
    el.ancestors()
        .filter_map(ElementRef::wrap)
        .any(|ancestor| cards.matches(&ancestor))
}

fn text_of(el: ElementRef) -> String {
    clean_text(&el.text().collect::<String>())
}

fn card_candidate(card: ElementRef, s: &Selectors) -> RawCandidate {
    let mut candidate = RawCandidate::new(CandidateSource::Markup);

    if let Some(id) = card.value().attr("data-profile-id") {
        candidate.insert("profile_id", id);
    }

    let anchor = card.select(&s.anchor).next();
    if let Some(a) = anchor {
        if let Some(href) = a.value().attr("href") {
            candidate.insert("href", href);
        }
        insert_passthrough(a, &mut candidate);
    }

    if let Some(src) = card.select(&s.image).next().and_then(image_source) {
        candidate.insert("image", src);
    }

    let title = card
        .select(&s.title)
        .next()
        .map(text_of)
        .or_else(|| anchor.map(text_of))
        .filter(|t| !t.is_empty());
    if let Some(title) = title {
        candidate.insert("title", title);
    }

    match card.select(&s.subtitle).next() {
        Some(sub) => candidate.insert("subtitle_text", text_of(sub)),
        None => {
            if let Some(label) = anchor.and_then(anchor_label) {
                candidate.insert("subtitle_text", label);
            }
        }
    }

    candidate
}

/// Fallback anchor heuristic: profile-looking hrefs with non-navigation text.
fn heuristic_candidates(document: &Html, s: &Selectors) -> Vec<RawCandidate> {
    document
        .select(&s.anchor)
        .filter_map(|a| {
            let href = a.value().attr("href")?;
            if !PROFILE_HREF_PATTERNS.iter().any(|p| href.contains(p)) {
                return None;
            }
            if is_pagination_link(a) || is_listing_href(href) {
                return None;
            }
            let text = text_of(a);
            if text.is_empty() {
                return None;
            }
            let lower = text.to_lowercase();
            if NAVIGATION_WORDS.iter().any(|w| lower.contains(w)) {
                return None;
            }

            let mut candidate = RawCandidate::new(CandidateSource::Markup)
                .with("href", href)
                .with("title", text);
            if let Some(label) = anchor_label(a) {
                candidate.insert("subtitle_text", label);
            }
            if let Some(src) = a.select(&s.image).next().and_then(image_source) {
                candidate.insert("image", src);
            }
            insert_passthrough(a, &mut candidate);
            Some(candidate)
        })
        .collect()
}

fn is_pagination_link(a: ElementRef<'_>) -> bool {
    a.value()
        .attr("rel")
        .is_some_and(|rel| rel.split_whitespace().any(|r| r.eq_ignore_ascii_case("next")))
}

/// True when the href's last path segment names a listing (`/x/following`).
fn is_listing_href(href: &str) -> bool {
    let path = href.split(['?', '#']).next().unwrap_or_default();
    let last = path.trim_end_matches('/').rsplit('/').next().unwrap_or_default();
    LISTING_SEGMENTS.contains(&last)
}

fn image_source(img: ElementRef<'_>) -> Option<&str> {
    img.value()
        .attr("src")
        .or_else(|| img.value().attr("data-src"))
        .filter(|s| !s.trim().is_empty())
}

fn anchor_label(a: ElementRef<'_>) -> Option<String> {
    a.value()
        .attr("aria-label")
        .or_else(|| a.value().attr("title"))
        .map(clean_text)
        .filter(|l| !l.is_empty())
}

fn insert_passthrough(a: ElementRef<'_>, candidate: &mut RawCandidate) {
    for (attr, key) in PASSTHROUGH_ATTRS {
        if let Some(value) = a.value().attr(attr) {
            candidate.insert(key, value);
        }
    }
}

fn next_token(document: &Html, s: &Selectors) -> Option<String> {
    document
        .select(&s.next_cursor)
        .find_map(|el| el.value().attr("data-next-cursor"))
        .or_else(|| {
            document
                .select(&s.cursor)
                .find_map(|el| el.value().attr("data-cursor"))
        })
        .or_else(|| {
            document
                .select(&s.rel_next)
                .find_map(|el| el.value().attr("href"))
        })
        .map(str::to_string)
}
