//! URL authority component (userinfo@host:port).

use super::encoding;
use super::error::InvalidUrl;
use std::net::Ipv6Addr;

/// Raw pieces of an authority before normalization.
///
/// WHY: `Url` stores user, password, host and port as separate fields so they
/// can be replaced or stripped individually, but they arrive together in the
/// `//authority` part of a URL string.
///
/// WHAT: Splits `[user[:pass]@]host[:port]` into its parts and validates the
/// port and IPv6 literal syntax.
///
/// HOW: Userinfo ends at the last `@`. IPv6 hosts are bracketed, so the port
/// separator is searched after the closing bracket.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct Authority<'a> {
    pub user: Option<&'a str>,
    pub pass: Option<&'a str>,
    pub host: &'a str,
    pub port: Option<u16>,
}

impl<'a> Authority<'a> {
    /// Parses the text between `//` and the first `/`, `?` or `#`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidUrl::Malformed` for an unclosed or invalid IPv6
    /// literal, stray characters after it, or a port that is not a number
    /// in `0..=65535`.
    pub(crate) fn parse(url: &str, s: &'a str) -> Result<Self, InvalidUrl> {
        let (userinfo, host_port) = match s.rfind('@') {
            Some(at_pos) => (Some(&s[..at_pos]), &s[at_pos + 1..]),
            None => (None, s),
        };

        let (user, pass) = match userinfo {
            Some(info) => match info.split_once(':') {
                Some((user, pass)) => (Some(user), Some(pass)),
                None => (Some(info), None),
            },
            None => (None, None),
        };

        let (host, port) = Self::parse_host_port(url, host_port)?;

        Ok(Authority {
            user,
            pass,
            host,
            port,
        })
    }

    fn parse_host_port(url: &str, s: &'a str) -> Result<(&'a str, Option<u16>), InvalidUrl> {
        if s.starts_with('[') {
            let close_bracket = s
                .find(']')
                .ok_or_else(|| InvalidUrl::malformed(url, "unclosed IPv6 bracket"))?;

            let ipv6_str = &s[1..close_bracket];
            if ipv6_str.parse::<Ipv6Addr>().is_err() {
                return Err(InvalidUrl::malformed(
                    url,
                    format!("invalid IPv6 address: {ipv6_str}"),
                ));
            }

            let after_bracket = &s[close_bracket + 1..];
            let port = if let Some(port) = after_bracket.strip_prefix(':') {
                Self::parse_port(url, port)?
            } else if after_bracket.is_empty() {
                None
            } else {
                return Err(InvalidUrl::malformed(
                    url,
                    "invalid characters after IPv6 bracket",
                ));
            };

            return Ok((&s[..=close_bracket], port));
        }

        match s.rfind(':') {
            Some(colon_pos) => {
                let port = Self::parse_port(url, &s[colon_pos + 1..])?;
                Ok((&s[..colon_pos], port))
            }
            None => Ok((s, None)),
        }
    }

    /// Parses a port string; an empty port (`host:`) means "no port".
    fn parse_port(url: &str, s: &str) -> Result<Option<u16>, InvalidUrl> {
        if s.is_empty() {
            return Ok(None);
        }

        if !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(InvalidUrl::malformed(url, format!("invalid port: {s}")));
        }

        s.parse::<u16>()
            .map(Some)
            .map_err(|_| InvalidUrl::malformed(url, format!("port out of range: {s}")))
    }
}

/// Normalizes a host for storage.
///
/// IPv6 literals keep their brackets and are lowercased. Everything else is
/// percent-decoded and lowercased; internationalized names are converted to
/// their ASCII (punycode) form, and any remaining unsafe bytes are escaped.
pub(crate) fn normalize_host(raw: &str) -> String {
    if raw.starts_with('[') {
        return raw.to_ascii_lowercase();
    }

    let decoded = encoding::decode(raw).to_lowercase();
    if decoded.is_ascii() {
        return encoding::encode(&decoded, encoding::HOST);
    }

    match ::url::Host::parse(&decoded) {
        Ok(::url::Host::Domain(domain)) => domain,
        Ok(::url::Host::Ipv4(addr)) => addr.to_string(),
        Ok(::url::Host::Ipv6(addr)) => format!("[{addr}]"),
        Err(err) => {
            tracing::debug!("IDN conversion failed for host {decoded:?}: {err}");
            encoding::encode(&decoded, encoding::HOST)
        }
    }
}
