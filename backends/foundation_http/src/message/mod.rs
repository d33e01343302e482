//! HTTP message types: headers, bodies, requests and responses.
//!
//! WHY: Both ends of an exchange share the same shape (version, headers,
//! body), and the connector, client and redirect logic operate on them
//! through one trait.
//!
//! WHAT: [`HeaderCollection`], [`MessageBody`], [`Request`], [`Response`]
//! and the supporting [`Method`], [`Proto`] and status tables.
//!
//! HOW: Messages are plain owned values. A [`Response`] keeps an
//! `Arc<Request>` back-reference so redirects can be resolved against the
//! request that produced them.

mod body;
mod errors;
mod headers;
mod method;
mod proto;
mod request;
mod response;
mod status;

pub use body::*;
pub use errors::*;
pub use headers::*;
pub use method::*;
pub use proto::*;
pub use request::*;
pub use response::*;
pub use status::*;

/// Accessors shared by requests and responses.
pub trait HttpMessage {
    fn version(&self) -> Proto;

    fn set_version(&mut self, version: Proto);

    fn headers(&self) -> &HeaderCollection;

    fn headers_mut(&mut self) -> &mut HeaderCollection;

    fn body(&self) -> &MessageBody;

    fn body_mut(&mut self) -> &mut MessageBody;
}
