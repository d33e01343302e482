//! HTTP protocol version.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use super::errors::MessageError;

/// HTTP protocol version carried by a message.
///
/// Versions are not validated beyond their syntax: a caller may send
/// `HTTP/1.0` requests or receive `HTTP/0.9` responses, and any other
/// `HTTP/M.m` is kept as `Other`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Proto {
    HTTP09,
    HTTP10,
    #[default]
    HTTP11,
    Other(u8, u8),
}

impl Proto {
    /// Returns the `(major, minor)` version pair.
    #[must_use]
    pub const fn numeric(&self) -> (u8, u8) {
        match self {
            Self::HTTP09 => (0, 9),
            Self::HTTP10 => (1, 0),
            Self::HTTP11 => (1, 1),
            Self::Other(major, minor) => (*major, *minor),
        }
    }

    #[must_use]
    pub const fn from_numeric(major: u8, minor: u8) -> Self {
        match (major, minor) {
            (0, 9) => Self::HTTP09,
            (1, 0) => Self::HTTP10,
            (1, 1) => Self::HTTP11,
            (major, minor) => Self::Other(major, minor),
        }
    }

    /// Returns true for HTTP/1.1 and later, where connections persist by default.
    #[must_use]
    pub fn persistent_by_default(&self) -> bool {
        *self >= Self::HTTP11
    }
}

impl PartialOrd for Proto {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Proto {
    fn cmp(&self, other: &Self) -> Ordering {
        self.numeric().cmp(&other.numeric())
    }
}

impl FromStr for Proto {
    type Err = MessageError;

    /// Accepts `HTTP/1.1` as well as a bare `1.1`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let version = trimmed
            .strip_prefix("HTTP/")
            .or_else(|| trimmed.strip_prefix("http/"))
            .unwrap_or(trimmed);

        let invalid = || MessageError::InvalidVersion(s.to_string());
        let (major, minor) = match version.split_once('.') {
            Some((major, minor)) => (major, minor),
            None => (version, "0"),
        };

        let major = major.parse::<u8>().map_err(|_| invalid())?;
        let minor = minor.parse::<u8>().map_err(|_| invalid())?;
        Ok(Self::from_numeric(major, minor))
    }
}

impl fmt::Display for Proto {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (major, minor) = self.numeric();
        write!(f, "HTTP/{major}.{minor}")
    }
}
