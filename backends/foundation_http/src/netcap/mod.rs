//! Transport streams: TCP sockets, optionally wrapped in TLS.

pub mod errors;
pub use errors::*;

#[cfg(feature = "ssl-rustls")]
pub mod ssl;

mod stream;
pub use stream::*;
