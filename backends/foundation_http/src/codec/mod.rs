//! Wire codec for HTTP/1.x: request serialization, response parsing,
//! chunked transfer decoding and content decoding.

mod chunked;
mod content;
mod errors;
mod reader;
mod writer;

pub use chunked::*;
pub use content::*;
pub use errors::*;
pub use reader::*;
pub use writer::*;
