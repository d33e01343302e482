//! URL parsing error types.

use std::fmt;

/// Error returned when a URL cannot be decomposed or resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidUrl {
    /// The input string could not be split into URL components.
    Malformed { url: String, reason: String },

    /// `resolve` was called on a URL that has no scheme.
    Relative { base: String },
}

impl InvalidUrl {
    pub(crate) fn malformed(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Malformed {
            url: url.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for InvalidUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed { url, reason } => write!(f, "failed to parse URL {url}: {reason}"),
            Self::Relative { base } => write!(f, "cannot resolve against relative URL {base}"),
        }
    }
}

impl std::error::Error for InvalidUrl {}
