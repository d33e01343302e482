//! URL scheme component.

use super::error::InvalidUrl;
use std::fmt;

/// URL scheme (http, https, etc.).
///
/// WHY: The scheme determines the transport and the default port for a URL.
/// Serialization omits ports equal to the scheme's default, so the scheme must
/// know its registered port.
///
/// WHAT: Represents the scheme with fast paths for HTTP and HTTPS and
/// extensibility for other schemes.
///
/// HOW: Stores the scheme lowercased and validates it against RFC 3986 during
/// parsing.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Scheme {
    inner: SchemeInner,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum SchemeInner {
    Http,
    Https,
    Custom(String),
}

impl Scheme {
    /// HTTP scheme constant.
    pub const HTTP: Scheme = Scheme {
        inner: SchemeInner::Http,
    };

    /// HTTPS scheme constant.
    pub const HTTPS: Scheme = Scheme {
        inner: SchemeInner::Https,
    };

    /// Parses a scheme name (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns `InvalidUrl::Malformed` if the name is empty or contains
    /// characters outside `ALPHA *( ALPHA / DIGIT / "+" / "-" / "." )`.
    pub fn parse(name: &str) -> Result<Self, InvalidUrl> {
        if !Self::is_valid_scheme(name) {
            return Err(InvalidUrl::malformed(
                name,
                format!("invalid scheme characters: {name}"),
            ));
        }

        let lower = name.to_ascii_lowercase();
        Ok(match lower.as_str() {
            "http" => Self::HTTP,
            "https" => Self::HTTPS,
            _ => Scheme {
                inner: SchemeInner::Custom(lower),
            },
        })
    }

    fn is_valid_scheme(s: &str) -> bool {
        let mut chars = s.chars();

        // First character must be alphabetic
        if !chars.next().is_some_and(|c| c.is_ascii_alphabetic()) {
            return false;
        }

        chars.all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-' || c == '.')
    }

    /// Returns the scheme as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match &self.inner {
            SchemeInner::Http => "http",
            SchemeInner::Https => "https",
            SchemeInner::Custom(s) => s,
        }
    }

    /// Returns the registered TCP port for this scheme, if it has one.
    ///
    /// # Examples
    ///
    /// ```
    /// use foundation_http::url::Scheme;
    ///
    /// assert_eq!(Scheme::HTTP.default_port(), Some(80));
    /// assert_eq!(Scheme::HTTPS.default_port(), Some(443));
    /// assert_eq!(Scheme::parse("gopher").unwrap().default_port(), Some(70));
    /// assert_eq!(Scheme::parse("x-custom").unwrap().default_port(), None);
    /// ```
    #[must_use]
    pub fn default_port(&self) -> Option<u16> {
        match &self.inner {
            SchemeInner::Http => Some(80),
            SchemeInner::Https => Some(443),
            SchemeInner::Custom(name) => match name.as_str() {
                "ftp" => Some(21),
                "ssh" | "sftp" => Some(22),
                "telnet" => Some(23),
                "gopher" => Some(70),
                "ws" => Some(80),
                "wss" => Some(443),
                "ldap" => Some(389),
                "ldaps" => Some(636),
                _ => None,
            },
        }
    }

    /// Returns true if this is the HTTP scheme.
    #[must_use]
    pub fn is_http(&self) -> bool {
        matches!(self.inner, SchemeInner::Http)
    }

    /// Returns true if this is the HTTPS scheme.
    #[must_use]
    pub fn is_https(&self) -> bool {
        matches!(self.inner, SchemeInner::Https)
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheme_constants() {
        assert_eq!(Scheme::HTTP.as_str(), "http");
        assert_eq!(Scheme::HTTPS.as_str(), "https");
        assert_eq!(Scheme::HTTP.default_port(), Some(80));
        assert_eq!(Scheme::HTTPS.default_port(), Some(443));
    }

    #[test]
    fn test_scheme_case_insensitive() {
        assert_eq!(Scheme::parse("HTTP").unwrap(), Scheme::HTTP);
        assert_eq!(Scheme::parse("HtTpS").unwrap(), Scheme::HTTPS);
        assert_eq!(Scheme::parse("FTP").unwrap().as_str(), "ftp");
    }

    #[test]
    fn test_scheme_validation() {
        assert!(Scheme::parse("").is_err());
        assert!(Scheme::parse("123").is_err());
        assert!(Scheme::parse("ht@tp").is_err());
        assert!(Scheme::parse("http+unix").is_ok());
        assert!(Scheme::parse("custom-scheme").is_ok());
        assert!(Scheme::parse("scheme.v2").is_ok());
    }

    #[test]
    fn test_scheme_is_http_https() {
        assert!(Scheme::HTTP.is_http());
        assert!(!Scheme::HTTP.is_https());
        assert!(Scheme::HTTPS.is_https());
        assert!(!Scheme::HTTPS.is_http());
    }
}
