use derive_more::From;
use std::io;

use crate::codec::{ChunkError, CodecError};
use crate::message::MessageError;
use crate::netcap::TlsError;
use crate::url::InvalidUrl;

pub type HttpClientResult<T> = std::result::Result<T, HttpClientError>;

/// DNS resolution errors.
#[derive(From, Debug, Clone, PartialEq, Eq)]
pub enum DnsError {
    #[from(ignore)]
    ResolutionFailed(String),

    #[from(ignore)]
    InvalidHost(String),

    #[from(ignore)]
    NoAddressesFound(String),

    #[from(ignore)]
    IoError(String),
}

impl From<io::Error> for DnsError {
    fn from(err: io::Error) -> Self {
        DnsError::IoError(err.to_string())
    }
}

impl std::error::Error for DnsError {}

impl core::fmt::Display for DnsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ResolutionFailed(host) => write!(f, "DNS resolution failed for host: {host}"),
            Self::InvalidHost(host) => write!(f, "Invalid hostname: {host}"),
            Self::NoAddressesFound(host) => write!(f, "No addresses found for host: {host}"),
            Self::IoError(err) => write!(f, "I/O error during DNS resolution: {err}"),
        }
    }
}

/// Everything that can end an exchange started through
/// [`crate::client::Connector::send`] or [`crate::client::HttpClient::send`].
///
/// None of these are recoverable for the current exchange. Non-fatal
/// conditions (unknown content-encodings, chunk extensions, short writes)
/// are logged instead.
#[derive(From, Debug)]
pub enum HttpClientError {
    #[from(ignore)]
    MalformedUrl { url: String, reason: String },

    /// A relative reference was resolved against a URL with no scheme.
    #[from(ignore)]
    RelativeUrl(String),

    /// The request URL's scheme is neither `http` nor `https`.
    #[from(ignore)]
    UnsupportedProtocol(String),

    /// DNS, TCP connect, TLS handshake or timeout failure.
    #[from(ignore)]
    Connection {
        host: String,
        port: u16,
        errno: Option<i32>,
        reason: String,
    },

    /// The status line or header block could not be parsed.
    #[from(ignore)]
    Protocol(String),

    MalformedChunk(ChunkError),

    /// A write failed or the stream ended before the declared body length.
    #[from(ignore)]
    Transfer(String),

    /// A persistent connection returned a body with no length signal.
    IndeterminateLength,

    /// The redirect budget was exhausted; carries the number of attempts.
    #[from(ignore)]
    TooManyRedirects(usize),

    MissingRedirectLocation,

    #[from(ignore)]
    InvalidOperation(String),

    #[from(ignore)]
    Decoding { encoding: String, reason: String },

    #[from(ignore)]
    Io(io::Error),
}

impl HttpClientError {
    /// Builds a `Connection` error from an I/O failure against `host:port`.
    pub(crate) fn connection(host: &str, port: u16, err: &io::Error) -> Self {
        Self::Connection {
            host: host.to_string(),
            port,
            errno: err.raw_os_error(),
            reason: err.to_string(),
        }
    }

    pub(crate) fn connection_reason(host: &str, port: u16, reason: impl Into<String>) -> Self {
        Self::Connection {
            host: host.to_string(),
            port,
            errno: None,
            reason: reason.into(),
        }
    }

    pub(crate) fn tls(host: &str, port: u16, err: TlsError) -> Self {
        match err {
            TlsError::IO(io_err) => Self::connection(host, port, &io_err),
            other => Self::connection_reason(host, port, other.to_string()),
        }
    }

    pub(crate) fn dns(host: &str, port: u16, err: &DnsError) -> Self {
        Self::connection_reason(host, port, err.to_string())
    }

    /// Lifts a codec failure into the client taxonomy; I/O timeouts and
    /// resets while talking to `host:port` become `Connection` errors.
    pub(crate) fn from_codec(err: CodecError, host: &str, port: u16) -> Self {
        match err {
            CodecError::Io(io_err) => Self::connection(host, port, &io_err),
            other => Self::from(other),
        }
    }

    /// True for `Connection` and `Transfer` errors, the failures a stale
    /// pooled connection produces.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. } | Self::Transfer(_) | Self::Io(_)
        )
    }
}

impl From<InvalidUrl> for HttpClientError {
    fn from(err: InvalidUrl) -> Self {
        match err {
            InvalidUrl::Malformed { url, reason } => Self::MalformedUrl { url, reason },
            InvalidUrl::Relative { base } => Self::RelativeUrl(base),
        }
    }
}

impl From<MessageError> for HttpClientError {
    fn from(err: MessageError) -> Self {
        match err {
            MessageError::InvalidOperation(reason) => Self::InvalidOperation(reason),
            MessageError::MissingRedirectLocation => Self::MissingRedirectLocation,
            MessageError::InvalidLocation(invalid) => Self::from(invalid),
            MessageError::InvalidVersion(version) => {
                Self::Protocol(format!("invalid HTTP version: {version}"))
            }
        }
    }
}

impl From<CodecError> for HttpClientError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::Protocol(reason) => Self::Protocol(reason),
            CodecError::MalformedChunk(chunk) => Self::MalformedChunk(chunk),
            CodecError::Transfer(reason) => Self::Transfer(reason),
            CodecError::IndeterminateLength => Self::IndeterminateLength,
            CodecError::Decoding { encoding, reason } => Self::Decoding { encoding, reason },
            CodecError::Io(io_err) => Self::Io(io_err),
        }
    }
}

impl From<io::Error> for HttpClientError {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

impl std::error::Error for HttpClientError {}

impl core::fmt::Display for HttpClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MalformedUrl { url, reason } => write!(f, "Malformed URL {url}: {reason}"),
            Self::RelativeUrl(base) => write!(f, "Cannot resolve against relative URL {base}"),
            Self::UnsupportedProtocol(scheme) => write!(
                f,
                "Unsupported protocol: {scheme} (only HTTP and HTTPS are supported)"
            ),
            Self::Connection {
                host,
                port,
                errno,
                reason,
            } => match errno {
                Some(errno) => write!(f, "Connection to {host}:{port} failed (os error {errno}): {reason}"),
                None => write!(f, "Connection to {host}:{port} failed: {reason}"),
            },
            Self::Protocol(reason) => write!(f, "Protocol error: {reason}"),
            Self::MalformedChunk(err) => write!(f, "Malformed chunk: {err}"),
            Self::Transfer(reason) => write!(f, "Transfer error: {reason}"),
            Self::IndeterminateLength => write!(
                f,
                "Response on a persistent connection has no Content-Length or chunked framing"
            ),
            Self::TooManyRedirects(attempts) => {
                write!(f, "Too many redirects: gave up after {attempts} attempts")
            }
            Self::MissingRedirectLocation => write!(f, "Redirect response has no Location header"),
            Self::InvalidOperation(reason) => write!(f, "Invalid operation: {reason}"),
            Self::Decoding { encoding, reason } => {
                write!(f, "Failed to decode {encoding} body: {reason}")
            }
            Self::Io(err) => write!(f, "I/O error: {err}"),
        }
    }
}
