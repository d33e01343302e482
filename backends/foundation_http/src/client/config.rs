//! Client, connector and proxy configuration.
//!
//! All structs deserialize from TOML with every field optional:
//!
//! ```toml
//! max_redirects = 3
//! user_agent = "{name}/{version}"
//!
//! [default_headers]
//! X-Team = "platform"
//!
//! [connector]
//! connect_timeout = 5
//! pooling = true
//!
//! [connector.proxy]
//! host = "proxy.internal"
//! port = 3128
//! ```

use derive_more::From;
use serde::Deserialize;
use std::time::Duration;

use crate::message::HeaderCollection;

#[derive(Debug, From)]
pub enum ConfigError {
    #[from(ignore)]
    IOError(std::io::Error),

    #[from(ignore)]
    DeserializationFailed(toml::de::Error),
}

impl From<toml::de::Error> for ConfigError {
    fn from(value: toml::de::Error) -> Self {
        Self::DeserializationFailed(value)
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(value: std::io::Error) -> Self {
        Self::IOError(value)
    }
}

impl std::error::Error for ConfigError {}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IOError(err) => write!(f, "failed to read client config: {err}"),
            Self::DeserializationFailed(err) => write!(f, "invalid client config: {err}"),
        }
    }
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

pub const DEFAULT_MAX_REDIRECTS: usize = 5;
pub const DEFAULT_USER_AGENT: &str = "{name}/{version} (compatible; +{repository})";
pub const DEFAULT_ACCEPT: &str = "*/*";

fn default_max_redirects() -> usize {
    DEFAULT_MAX_REDIRECTS
}

fn default_true() -> bool {
    true
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_accept() -> String {
    DEFAULT_ACCEPT.to_string()
}

/// Settings for [`crate::client::HttpClient`].
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ClientConfig {
    /// Redirects followed before failing with `TooManyRedirects`.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,

    #[serde(default = "default_true")]
    pub follow_redirects: bool,

    /// `User-Agent` template; `{name}`, `{version}` and `{repository}` are
    /// replaced with this crate's metadata.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_accept")]
    pub accept: String,

    /// Added to every request that does not already set them.
    pub default_headers: HeaderCollection,

    /// When set, methods other than GET, HEAD and POST are sent as POST with
    /// the real method in this header.
    pub method_override_header: Option<String>,

    /// Follow `303 See Other` with a body-less GET instead of repeating the
    /// original method.
    pub see_other_as_get: bool,

    pub connector: ConnectorConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            max_redirects: DEFAULT_MAX_REDIRECTS,
            follow_redirects: true,
            user_agent: default_user_agent(),
            accept: default_accept(),
            default_headers: HeaderCollection::new(),
            method_override_header: None,
            see_other_as_get: false,
            connector: ConnectorConfig::default(),
        }
    }
}

impl ClientConfig {
    /// # Errors
    ///
    /// Returns `ConfigError::DeserializationFailed` for invalid TOML or
    /// mistyped fields.
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// # Errors
    ///
    /// Returns `ConfigError::IOError` if the file cannot be read, otherwise
    /// see [`ClientConfig::from_toml_str`].
    pub fn from_path(path: impl AsRef<std::path::Path>) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Expands the `User-Agent` template.
    #[must_use]
    pub fn user_agent(&self) -> String {
        self.user_agent
            .replace("{name}", env!("CARGO_PKG_NAME"))
            .replace("{version}", env!("CARGO_PKG_VERSION"))
            .replace("{repository}", env!("CARGO_PKG_REPOSITORY"))
    }
}

/// Settings for [`crate::client::StreamConnector`]. Timeouts are in seconds.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ConnectorConfig {
    pub connect_timeout: Option<u64>,
    pub read_timeout: Option<u64>,
    pub write_timeout: Option<u64>,

    /// Keep connections open and reuse them per (transport, host, port).
    pub pooling: bool,
    pub pool_max_per_host: usize,

    /// Seconds an idle pooled connection stays eligible for reuse.
    pub pool_max_idle: u64,

    /// Seconds a stored `ETag`/`Last-Modified` pair stays valid.
    pub validator_ttl: u64,

    /// Seconds a resolved host stays in the connector's DNS cache.
    pub dns_cache_ttl: u64,

    pub proxy: Option<ProxyConfig>,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            connect_timeout: None,
            read_timeout: None,
            write_timeout: None,
            pooling: false,
            pool_max_per_host: 10,
            pool_max_idle: 300,
            validator_ttl: 3600,
            dns_cache_ttl: 300,
            proxy: None,
        }
    }
}

impl ConnectorConfig {
    #[must_use]
    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout.map(Duration::from_secs)
    }

    #[must_use]
    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout.map(Duration::from_secs)
    }

    #[must_use]
    pub fn write_timeout(&self) -> Option<Duration> {
        self.write_timeout.map(Duration::from_secs)
    }

    #[must_use]
    pub fn pool_max_idle(&self) -> Duration {
        Duration::from_secs(self.pool_max_idle)
    }

    #[must_use]
    pub fn validator_ttl(&self) -> Duration {
        Duration::from_secs(self.validator_ttl)
    }

    #[must_use]
    pub fn dns_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.dns_cache_ttl)
    }
}

fn default_bypass() -> Vec<String> {
    vec!["localhost".into(), "127.0.0.1".into(), "::1".into()]
}

/// Forward proxy for [`crate::client::ProxyingConnector`].
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct ProxyConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,

    /// Hosts contacted directly. `*.example.org` matches subdomains.
    #[serde(default = "default_bypass")]
    pub bypass: Vec<String>,
}

impl ProxyConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            username: None,
            password: None,
            bypass: default_bypass(),
        }
    }

    #[must_use]
    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    #[must_use]
    pub fn with_bypass(mut self, bypass: Vec<String>) -> Self {
        self.bypass = bypass;
        self
    }

    /// True when `host` should be reached without the proxy.
    #[must_use]
    pub fn bypasses(&self, host: &str) -> bool {
        let host = host.trim_start_matches('[').trim_end_matches(']');
        self.bypass.iter().any(|pattern| {
            let pattern = pattern.trim_start_matches('[').trim_end_matches(']');
            match pattern.strip_prefix("*.") {
                Some(suffix) => {
                    host.eq_ignore_ascii_case(suffix)
                        || host
                            .to_ascii_lowercase()
                            .ends_with(&format!(".{}", suffix.to_ascii_lowercase()))
                }
                None => host.eq_ignore_ascii_case(pattern),
            }
        })
    }
}
