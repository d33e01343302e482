//! URL parsing, normalization and resolution.
//!
//! WHY: Every request is addressed by a URL, redirects hand back relative
//! references, and the validator cache keys entries by a canonical URL
//! string. All three need one normalized representation.
//!
//! WHAT: Provides [`Url`], a mutable URL value whose components are normalized
//! on every write:
//! - Scheme (lowercased, validated)
//! - User and password (percent-normalized)
//! - Host (lowercased, IDN converted to ASCII)
//! - Port (dropped when equal to the scheme default)
//! - Path (dot segments removed, percent-normalized)
//! - Query (held as ordered [`QueryParams`])
//! - Fragment
//!
//! HOW: Parsing uses the RFC 3986 Appendix B regular expression to split the
//! input, then feeds each piece through the same setters callers use, so a
//! parsed URL and a built URL normalize identically.

mod authority;
mod encoding;
mod error;
mod path;
mod query;
mod scheme;

pub use error::*;
pub use path::*;
pub use query::*;
pub use scheme::*;

use std::fmt;
use std::ops::{BitOr, BitOrAssign};
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

use authority::{normalize_host, Authority};

static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:([^:/?#]+):)?(?://([^/?#]*))?([^?#]*)(?:\?([^#]*))?(?:#(.*))?$")
        .expect("RFC 3986 pattern compiles")
});

/// Bitmask selecting URL components for [`Url::strip`] and [`Url::filter`].
///
/// # Examples
///
/// ```
/// use foundation_http::url::{Components, Url};
///
/// let url = Url::parse("http://u:p@example.com/a?b=1#c").unwrap();
/// let clean = url.strip(Components::AUTH | Components::FRAGMENT);
/// assert_eq!(clean.to_string(), "http://example.com/a?b=1");
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Components(u16);

impl Components {
    pub const NONE: Components = Components(0);
    pub const SCHEME: Components = Components(0x001);
    pub const USER: Components = Components(0x002);
    pub const PASS: Components = Components(0x004);
    /// User and password together.
    pub const AUTH: Components = Components(0x006);
    pub const HOST: Components = Components(0x008);
    pub const PORT: Components = Components(0x010);
    pub const PATH: Components = Components(0x020);
    pub const QUERY: Components = Components(0x040);
    pub const FRAGMENT: Components = Components(0x080);
    pub const ALL: Components = Components(0x0FF);

    /// Returns true if any bit of `other` is set in `self`.
    #[must_use]
    pub const fn intersects(self, other: Components) -> bool {
        self.0 & other.0 != 0
    }

    #[must_use]
    pub const fn bits(self) -> u16 {
        self.0
    }
}

impl BitOr for Components {
    type Output = Components;

    fn bitor(self, rhs: Self) -> Self::Output {
        Components(self.0 | rhs.0)
    }
}

impl BitOrAssign for Components {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Plain record of URL components, used to build a [`Url`] piecewise or to
/// inspect one without going through accessors.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UrlParts {
    pub scheme: Option<String>,
    pub user: Option<String>,
    pub pass: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub path: Option<String>,
    /// Raw query string; ignored when `params` is set.
    pub query: Option<String>,
    pub params: Option<QueryParams>,
    pub fragment: Option<String>,
}

/// A URL with normalized components.
///
/// WHY: Requests, redirects and cache keys all need URLs that compare and
/// serialize consistently regardless of how they were spelled.
///
/// WHAT: Every component is optional, so the same type represents absolute
/// URLs (`http://host/path`), network-path references (`//host/path`) and
/// relative references (`../a?b`).
///
/// HOW: Components are stored normalized; [`fmt::Display`] reassembles them.
///
/// # Examples
///
/// ```
/// use foundation_http::url::Url;
///
/// let url = Url::parse("HTTP://User@Example.COM:80/a/./b/../c?x=1#top").unwrap();
/// assert_eq!(url.scheme().unwrap().as_str(), "http");
/// assert_eq!(url.host(), Some("example.com"));
/// assert_eq!(url.port(), None);
/// assert_eq!(url.path(), Some("/a/c"));
/// assert_eq!(url.to_string(), "http://User@example.com/a/c?x=1#top");
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Url {
    scheme: Option<Scheme>,
    user: Option<String>,
    pass: Option<String>,
    host: Option<String>,
    port: Option<u16>,
    path: Option<String>,
    params: QueryParams,
    fragment: Option<String>,
}

impl Url {
    /// Creates an empty URL.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a URL string.
    ///
    /// Relative references are accepted; use [`Url::is_absolute`] to check
    /// for a scheme.
    ///
    /// # Errors
    ///
    /// Returns `InvalidUrl::Malformed` if the input contains control
    /// characters, has an invalid scheme or port, an invalid IPv6 literal, or
    /// an empty authority for an `http`/`https` URL.
    pub fn parse(input: &str) -> Result<Self, InvalidUrl> {
        let trimmed = input.trim();
        if trimmed.chars().any(char::is_control) {
            return Err(InvalidUrl::malformed(input, "control characters in URL"));
        }

        let caps = URL_PATTERN
            .captures(trimmed)
            .ok_or_else(|| InvalidUrl::malformed(input, "not a URL"))?;

        let mut url = Url::new();

        if let Some(scheme) = caps.get(1) {
            url.set_scheme(scheme.as_str())
                .map_err(|_| InvalidUrl::malformed(input, "invalid scheme"))?;
        }

        if let Some(authority) = caps.get(2) {
            let authority = authority.as_str();
            if authority.is_empty() {
                if url.scheme.as_ref().is_some_and(|s| s.is_http() || s.is_https()) {
                    return Err(InvalidUrl::malformed(input, "empty host"));
                }
            } else {
                let parts = Authority::parse(input, authority)?;
                if parts.host.is_empty() {
                    return Err(InvalidUrl::malformed(input, "empty host"));
                }
                if let Some(user) = parts.user {
                    url.set_user(user);
                }
                if let Some(pass) = parts.pass {
                    url.set_pass(pass);
                }
                url.set_host(parts.host);
                if let Some(port) = parts.port {
                    url.set_port(port);
                }
            }
        }

        if let Some(path) = caps.get(3) {
            url.set_path(path.as_str());
        }
        if let Some(query) = caps.get(4) {
            url.set_query(query.as_str());
        }
        if let Some(fragment) = caps.get(5) {
            url.set_fragment(fragment.as_str());
        }

        Ok(url)
    }

    /// Builds a URL from its parts, normalizing each one.
    ///
    /// # Errors
    ///
    /// Returns `InvalidUrl::Malformed` if the scheme is invalid.
    pub fn from_parts(parts: UrlParts) -> Result<Self, InvalidUrl> {
        let mut url = Url::new();
        if let Some(scheme) = parts.scheme.as_deref() {
            url.set_scheme(scheme)?;
        }
        if let Some(user) = parts.user.as_deref() {
            url.set_user(user);
        }
        if let Some(pass) = parts.pass.as_deref() {
            url.set_pass(pass);
        }
        if let Some(host) = parts.host.as_deref() {
            url.set_host(host);
        }
        if let Some(port) = parts.port {
            url.set_port(port);
        }
        if let Some(path) = parts.path.as_deref() {
            url.set_path(path);
        }
        match (parts.params, parts.query.as_deref()) {
            (Some(params), _) => url.set_params(params),
            (None, Some(query)) => url.set_query(query),
            (None, None) => {}
        }
        if let Some(fragment) = parts.fragment.as_deref() {
            url.set_fragment(fragment);
        }
        Ok(url)
    }

    /// Returns the components as a plain record.
    #[must_use]
    pub fn to_parts(&self) -> UrlParts {
        UrlParts {
            scheme: self.scheme.as_ref().map(|s| s.as_str().to_string()),
            user: self.user.clone(),
            pass: self.pass.clone(),
            host: self.host.clone(),
            port: self.port,
            path: self.path.clone(),
            query: self.query(),
            params: if self.params.is_empty() {
                None
            } else {
                Some(self.params.clone())
            },
            fragment: self.fragment.clone(),
        }
    }

    #[must_use]
    pub fn scheme(&self) -> Option<&Scheme> {
        self.scheme.as_ref()
    }

    /// Sets the scheme; an empty string clears it.
    ///
    /// # Errors
    ///
    /// Returns `InvalidUrl::Malformed` for invalid scheme characters.
    pub fn set_scheme(&mut self, scheme: &str) -> Result<(), InvalidUrl> {
        self.scheme = if scheme.is_empty() {
            None
        } else {
            Some(Scheme::parse(scheme)?)
        };
        Ok(())
    }

    #[must_use]
    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    /// Sets the user name; an empty string clears it.
    pub fn set_user(&mut self, user: &str) {
        self.user = non_empty(user).map(|u| encoding::normalize(u, encoding::USERINFO));
    }

    #[must_use]
    pub fn pass(&self) -> Option<&str> {
        self.pass.as_deref()
    }

    /// Sets the password; an empty string clears it.
    pub fn set_pass(&mut self, pass: &str) {
        self.pass = non_empty(pass).map(|p| encoding::normalize(p, encoding::USERINFO));
    }

    #[must_use]
    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    /// Sets the host; an empty string clears it.
    pub fn set_host(&mut self, host: &str) {
        self.host = non_empty(host).map(normalize_host);
    }

    /// Returns the explicit port. Ports equal to the scheme default are
    /// never stored, see [`Url::port_or_default`].
    #[must_use]
    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// Sets the port, dropping it if it equals the scheme's default port.
    pub fn set_port(&mut self, port: u16) {
        let default = self.scheme.as_ref().and_then(Scheme::default_port);
        self.port = if default == Some(port) {
            None
        } else {
            Some(port)
        };
    }

    pub fn clear_port(&mut self) {
        self.port = None;
    }

    /// Returns the explicit port or the scheme's default port.
    #[must_use]
    pub fn port_or_default(&self) -> Option<u16> {
        self.port
            .or_else(|| self.scheme.as_ref().and_then(Scheme::default_port))
    }

    #[must_use]
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Sets the path, removing dot segments; an empty result clears it.
    pub fn set_path(&mut self, path: &str) {
        let normalized = normalize_path(path);
        self.path = non_empty(&normalized).map(str::to_string);
    }

    /// Returns the encoded query string, or `None` when there are no params.
    #[must_use]
    pub fn query(&self) -> Option<String> {
        if self.params.is_empty() {
            None
        } else {
            Some(self.params.to_query_string())
        }
    }

    /// Replaces the query parameters by parsing `query` (without the `?`).
    pub fn set_query(&mut self, query: &str) {
        self.params = QueryParams::parse(query);
    }

    #[must_use]
    pub fn params(&self) -> &QueryParams {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut QueryParams {
        &mut self.params
    }

    pub fn set_params(&mut self, params: QueryParams) {
        self.params = params;
    }

    #[must_use]
    pub fn fragment(&self) -> Option<&str> {
        self.fragment.as_deref()
    }

    /// Sets the fragment; an empty string clears it.
    pub fn set_fragment(&mut self, fragment: &str) {
        self.fragment = non_empty(fragment).map(|f| encoding::normalize(f, encoding::FRAGMENT));
    }

    /// Returns true if the URL has a scheme.
    #[must_use]
    pub fn is_absolute(&self) -> bool {
        self.scheme.is_some()
    }

    /// Returns a copy without the selected components.
    #[must_use]
    pub fn strip(&self, components: Components) -> Url {
        let mut url = self.clone();
        url.clear(components);
        url
    }

    /// Returns a copy keeping only the selected components.
    #[must_use]
    pub fn filter(&self, components: Components) -> Url {
        let mut url = self.clone();
        url.clear(Components(Components::ALL.0 & !components.0));
        url
    }

    fn clear(&mut self, components: Components) {
        if components.intersects(Components::SCHEME) {
            self.scheme = None;
        }
        if components.intersects(Components::USER) {
            self.user = None;
        }
        if components.intersects(Components::PASS) {
            self.pass = None;
        }
        if components.intersects(Components::HOST) {
            self.host = None;
        }
        if components.intersects(Components::PORT) {
            self.port = None;
        }
        if components.intersects(Components::PATH) {
            self.path = None;
        }
        if components.intersects(Components::QUERY) {
            self.params = QueryParams::new();
        }
        if components.intersects(Components::FRAGMENT) {
            self.fragment = None;
        }
    }

    /// Resolves a reference against this URL (RFC 3986 section 5.2).
    ///
    /// # Errors
    ///
    /// Returns `InvalidUrl::Relative` if this URL has no scheme, or
    /// `InvalidUrl::Malformed` if `reference` fails to parse.
    ///
    /// # Examples
    ///
    /// ```
    /// use foundation_http::url::Url;
    ///
    /// let base = Url::parse("http://a/b/c/d;p?q").unwrap();
    /// assert_eq!(base.resolve("../g").unwrap().to_string(), "http://a/b/g");
    /// assert_eq!(base.resolve("?y").unwrap().to_string(), "http://a/b/c/d;p?y");
    /// assert_eq!(base.resolve("//g").unwrap().to_string(), "http://g");
    /// ```
    pub fn resolve<U: IntoUrl>(&self, reference: U) -> Result<Url, InvalidUrl> {
        if !self.is_absolute() {
            return Err(InvalidUrl::Relative {
                base: self.to_string(),
            });
        }

        let reference = reference.into_url()?;
        if reference.is_absolute() {
            return Ok(reference);
        }

        let mut target =
            self.filter(Components::SCHEME | Components::AUTH | Components::HOST | Components::PORT);
        target.fragment = reference.fragment.clone();

        if reference.host.is_some() {
            target.user = reference.user.clone();
            target.pass = reference.pass.clone();
            target.host = reference.host.clone();
            target.port = None;
            if let Some(port) = reference.port {
                target.set_port(port);
            }
            target.path = reference.path.clone();
            target.params = reference.params.clone();
            return Ok(target);
        }

        match reference.path.as_deref() {
            None => {
                target.path = self.path.clone();
                target.params = if reference.params.is_empty() {
                    self.params.clone()
                } else {
                    reference.params.clone()
                };
            }
            Some(path) => {
                let merged = if path.starts_with('/') {
                    path.to_string()
                } else {
                    self.merge_path(path)
                };
                target.set_path(&merged);
                target.params = reference.params.clone();
            }
        }

        Ok(target)
    }

    fn merge_path(&self, reference: &str) -> String {
        match self.path.as_deref() {
            None if self.host.is_some() => format!("/{reference}"),
            None => reference.to_string(),
            Some(base) => match base.rfind('/') {
                Some(slash) => format!("{}{reference}", &base[..=slash]),
                None => reference.to_string(),
            },
        }
    }

    /// Returns the canonical form used as a cache key: the URL without
    /// credentials or fragment.
    #[must_use]
    pub fn canonical(&self) -> String {
        self.strip(Components::AUTH | Components::FRAGMENT)
            .to_string()
    }

    /// Returns the origin-form request target: path (default `/`) plus query.
    #[must_use]
    pub fn request_target(&self) -> String {
        let mut target = match self.path.as_deref() {
            Some(path) if path.starts_with('/') => path.to_string(),
            Some(path) => format!("/{path}"),
            None => "/".to_string(),
        };
        if let Some(query) = self.query() {
            target.push('?');
            target.push_str(&query);
        }
        target
    }

    /// Returns the value for a `Host` header: host plus any explicit port.
    #[must_use]
    pub fn host_header(&self) -> Option<String> {
        let host = self.host.as_deref()?;
        Some(match self.port {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        })
    }

    /// Returns the decoded user and password, if a user is present.
    #[must_use]
    pub fn credentials(&self) -> Option<(String, String)> {
        let user = self.user.as_deref()?;
        let pass = self.pass.as_deref().unwrap_or("");
        Some((encoding::decode(user), encoding::decode(pass)))
    }

    /// Returns the host without IPv6 brackets, suitable for name resolution.
    #[must_use]
    pub fn host_for_connect(&self) -> Option<&str> {
        self.host
            .as_deref()
            .map(|host| host.trim_start_matches('[').trim_end_matches(']'))
    }
}

fn non_empty(value: &str) -> Option<&str> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

impl fmt::Display for Url {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(scheme) = &self.scheme {
            write!(f, "{scheme}:")?;
        }

        let has_authority = self.user.is_some() || self.host.is_some();
        if has_authority {
            f.write_str("//")?;
            if let Some(user) = &self.user {
                f.write_str(user)?;
                if let Some(pass) = &self.pass {
                    write!(f, ":{pass}")?;
                }
                f.write_str("@")?;
            }
            if let Some(host) = &self.host {
                f.write_str(host)?;
            }
            if let Some(port) = self.port {
                write!(f, ":{port}")?;
            }
        }

        let has_suffix = !self.params.is_empty() || self.fragment.is_some();
        match &self.path {
            Some(path) => {
                if has_authority && !path.starts_with('/') {
                    f.write_str("/")?;
                }
                f.write_str(path)?;
            }
            None if has_suffix && (has_authority || self.scheme.is_some()) => {
                f.write_str("/")?;
            }
            None => {}
        }

        if let Some(query) = self.query() {
            write!(f, "?{query}")?;
        }
        if let Some(fragment) = &self.fragment {
            write!(f, "#{fragment}")?;
        }
        Ok(())
    }
}

impl FromStr for Url {
    type Err = InvalidUrl;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Url::parse(s)
    }
}

impl TryFrom<&str> for Url {
    type Error = InvalidUrl;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Url::parse(value)
    }
}

impl TryFrom<String> for Url {
    type Error = InvalidUrl;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Url::parse(&value)
    }
}

impl TryFrom<UrlParts> for Url {
    type Error = InvalidUrl;

    fn try_from(value: UrlParts) -> Result<Self, Self::Error> {
        Url::from_parts(value)
    }
}

/// Conversion into a [`Url`], accepted wherever a URL argument is taken.
pub trait IntoUrl {
    /// # Errors
    ///
    /// Returns `InvalidUrl` if the value cannot be parsed as a URL.
    fn into_url(self) -> Result<Url, InvalidUrl>;
}

impl IntoUrl for Url {
    fn into_url(self) -> Result<Url, InvalidUrl> {
        Ok(self)
    }
}

impl IntoUrl for &Url {
    fn into_url(self) -> Result<Url, InvalidUrl> {
        Ok(self.clone())
    }
}

impl IntoUrl for &str {
    fn into_url(self) -> Result<Url, InvalidUrl> {
        Url::parse(self)
    }
}

impl IntoUrl for String {
    fn into_url(self) -> Result<Url, InvalidUrl> {
        Url::parse(&self)
    }
}

impl IntoUrl for &String {
    fn into_url(self) -> Result<Url, InvalidUrl> {
        Url::parse(self)
    }
}

impl IntoUrl for UrlParts {
    fn into_url(self) -> Result<Url, InvalidUrl> {
        Url::from_parts(self)
    }
}
