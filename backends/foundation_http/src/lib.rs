//! Blocking HTTP/1.x client engine.
//!
//! The crate is layered leaf to root:
//!
//! - [`url`]: parsing, normalization and serialization of URLs.
//! - [`message`]: headers, bodies, requests and responses.
//! - [`codec`]: wire-level framing (chunked transfer coding, content decoding,
//!   response parsing and request serialization).
//! - [`netcap`]: the raw byte streams (plain TCP or TLS) the connector talks over.
//! - [`client`]: connectors, connection pooling, the validator cache and the
//!   [`client::HttpClient`] facade with its redirect loop.

pub mod client;
pub mod codec;
pub mod message;
pub mod netcap;
pub mod url;

pub use client::{
    ClientConfig, Connector, ConnectorConfig, HttpClient, HttpClientError, HttpClientResult,
    ProxyConfig, ProxyingConnector, StreamConnector,
};
pub use message::{
    BodyContent, HeaderCollection, HttpMessage, MessageBody, Method, Proto, Request, Response,
};
pub use url::{Url, UrlParts};
