//! Record extraction from fetched page fragments.
//!
//! Extraction is an ordered chain of [`ExtractStrategy`] implementations.
//! Each either understands the fragment and returns candidates plus an
//! optional continuation token, or reports "not applicable" so the next
//! strategy gets a try. Embedded data blobs come first because they survive
//! markup changes; structural markup traversal is the fallback.

pub mod embedded;
pub mod markup;

pub use embedded::EmbeddedDataStrategy;
pub use markup::MarkupStrategy;

use crate::cursor::{Continuation, Cursor};
use crate::error::ExtractWarning;
use crate::fetch::PageFragment;
use crate::model::RawCandidate;
use tracing::debug;

/// What one strategy recovered from a fragment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StrategyOutput {
    pub candidates: Vec<RawCandidate>,
    /// Continuation token found on the page, if any.
    pub next_token: Option<String>,
    /// Explicit "more pages" flag when the page states one.
    pub has_more: Option<bool>,
}

/// One way of reading a page.
pub trait ExtractStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// `None` means the strategy does not recognize the fragment.
    fn apply(&self, fragment: &PageFragment) -> Option<StrategyOutput>;
}

/// Result of extracting one page.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub candidates: Vec<RawCandidate>,
    pub next: Continuation,
    pub warning: Option<ExtractWarning>,
    /// Name of the strategy that produced the result.
    pub strategy: Option<&'static str>,
}

/// Page-level extraction seam used by the controller.
pub trait PageExtractor: Send + Sync {
    /// Extract candidates from `fragment`, fetched with cursor `previous`.
    fn extract(&self, fragment: &PageFragment, previous: &Cursor) -> Extraction;
}

/// Strategy chain: embedded data first, then markup.
pub struct Extractor {
    strategies: Vec<Box<dyn ExtractStrategy>>,
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new()
    }
}

impl Extractor {
    pub fn new() -> Self {
        Self::with_strategies(vec![
            Box::new(EmbeddedDataStrategy),
            Box::new(MarkupStrategy::default()),
        ])
    }

    pub fn with_strategies(strategies: Vec<Box<dyn ExtractStrategy>>) -> Self {
        Self { strategies }
    }
}

impl PageExtractor for Extractor {
    fn extract(&self, fragment: &PageFragment, previous: &Cursor) -> Extraction {
        for strategy in &self.strategies {
            let Some(output) = strategy.apply(fragment) else {
                continue;
            };

            let next = if output.has_more == Some(false) {
                Continuation::Terminal
            } else {
                Continuation::from_token(output.next_token, previous)
            };
            let warning = (output.candidates.is_empty() && !next.is_terminal())
                .then_some(ExtractWarning::EmptyPage);

            debug!(
                strategy = strategy.name(),
                candidates = output.candidates.len(),
                terminal = next.is_terminal(),
                "extracted page"
            );

            return Extraction {
                candidates: output.candidates,
                next,
                warning,
                strategy: Some(strategy.name()),
            };
        }

        // Nothing recognized the page: keep the cursor and let the
        // controller's unproductive-page budget decide when to give up.
        Extraction {
            candidates: Vec::new(),
            next: Continuation::Next(previous.clone()),
            warning: Some(ExtractWarning::LayoutDrift),
            strategy: None,
        }
    }
}

/// Collapse runs of whitespace and trim.
pub(crate) fn clean_text(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CandidateSource;

    struct Fixed(Option<StrategyOutput>);

    impl ExtractStrategy for Fixed {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn apply(&self, _fragment: &PageFragment) -> Option<StrategyOutput> {
            self.0.clone()
        }
    }

    fn fragment() -> PageFragment {
        PageFragment::from_body("https://example.com/", "")
    }

    fn one_candidate() -> Vec<RawCandidate> {
        vec![RawCandidate::new(CandidateSource::Markup).with("title", "A")]
    }

    #[test]
    fn test_first_applicable_strategy_wins() {
        let extractor = Extractor::with_strategies(vec![
            Box::new(Fixed(None)),
            Box::new(Fixed(Some(StrategyOutput {
                candidates: one_candidate(),
                next_token: Some("c1".into()),
                has_more: None,
            }))),
        ]);
        let out = extractor.extract(&fragment(), &Cursor::Initial);
        assert_eq!(out.candidates.len(), 1);
        assert_eq!(out.next, Continuation::Next(Cursor::Token("c1".into())));
        assert_eq!(out.warning, None);
        assert_eq!(out.strategy, Some("fixed"));
    }

    #[test]
    fn test_has_more_false_is_terminal_even_with_token() {
        let extractor = Extractor::with_strategies(vec![Box::new(Fixed(Some(StrategyOutput {
            candidates: Vec::new(),
            next_token: Some("c9".into()),
            has_more: Some(false),
        })))]);
        let out = extractor.extract(&fragment(), &Cursor::Initial);
        assert!(out.next.is_terminal());
        assert_eq!(out.warning, None);
    }

    #[test]
    fn test_empty_page_with_continuation_warns() {
        let extractor = Extractor::with_strategies(vec![Box::new(Fixed(Some(StrategyOutput {
            candidates: Vec::new(),
            next_token: Some("c2".into()),
            has_more: Some(true),
        })))]);
        let out = extractor.extract(&fragment(), &Cursor::Token("c1".into()));
        assert_eq!(out.warning, Some(ExtractWarning::EmptyPage));
        assert_eq!(out.next, Continuation::Next(Cursor::Token("c2".into())));
    }

    #[test]
    fn test_unrecognized_page_is_layout_drift() {
        let extractor = Extractor::with_strategies(vec![Box::new(Fixed(None))]);
        let prev = Cursor::Token("c3".into());
        let out = extractor.extract(&fragment(), &prev);
        assert!(out.candidates.is_empty());
        assert_eq!(out.next, Continuation::Next(prev));
        assert_eq!(out.warning, Some(ExtractWarning::LayoutDrift));
        assert_eq!(out.strategy, None);
    }

    #[test]
    fn test_clean_text() {
        assert_eq!(clean_text("  Music \n ·   Artist "), "Music · Artist");
    }
}
