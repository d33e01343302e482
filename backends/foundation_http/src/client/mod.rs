// HTTP/1.x client.
//
// Layering, innermost first: DNS resolution and the connection pool feed the
// stream connector, which the proxying connector wraps; the HttpClient facade
// sits on top of any Connector and owns the redirect loop.

mod cache;
mod client;
mod config;
mod connector;
mod dns;
mod errors;
mod pool;
mod proxy;

pub use cache::*;
pub use client::*;
pub use config::*;
pub use connector::*;
pub use dns::*;
pub use errors::*;
pub use pool::*;
pub use proxy::*;
