//! Opaque pagination cursors.
//!
//! The listing's pagination mechanism is outside our control, so a token is
//! never inspected beyond equality (to detect a stalled listing).

use std::fmt;

/// Position in the listing handed to the fetcher.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum Cursor {
    /// First page; no token yet.
    #[default]
    Initial,
    /// Continuation token as returned by the page.
    Token(String),
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cursor::Initial => f.write_str("<initial>"),
            Cursor::Token(t) if t.chars().count() > 24 => {
                write!(f, "{}…", t.chars().take(24).collect::<String>())
            }
            Cursor::Token(t) => f.write_str(t),
        }
    }
}

/// What the extractor says comes after a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Continuation {
    Next(Cursor),
    Terminal,
}

impl Continuation {
    /// Build a continuation from a token found on the page.
    ///
    /// A missing or blank token, or one equal to the cursor that produced the
    /// page (the listing stalled), ends the listing.
    pub fn from_token(token: Option<String>, previous: &Cursor) -> Self {
        let Some(token) = token.map(|t| t.trim().to_string()).filter(|t| !t.is_empty()) else {
            return Continuation::Terminal;
        };
        let next = Cursor::Token(token);
        if &next == previous {
            Continuation::Terminal
        } else {
            Continuation::Next(next)
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Continuation::Terminal)
    }
}
