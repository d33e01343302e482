//! Request serialization.

use std::io::{self, Write};

use super::errors::{CodecError, CodecResult};
use crate::message::{HttpMessage, Proto, Request};

/// Renders `request` as wire bytes using `target` as the request-target.
///
/// `target` is origin-form (`/path?query`) for direct connections and
/// absolute-form when talking to a proxy. HTTP/0.9 requests are rendered as
/// a simple request line with no headers or body.
#[must_use]
pub fn serialize_request(request: &Request, target: &str) -> Vec<u8> {
    if request.version() == Proto::HTTP09 {
        return format!("GET {target}\r\n").into_bytes();
    }

    let mut out = format!(
        "{} {} {}\r\n{}",
        request.method().as_str(),
        target,
        request.version(),
        request.headers()
    )
    .into_bytes();

    if !request.body().is_empty() {
        out.extend_from_slice(request.body().as_bytes());
    }
    out
}

/// Writes all of `bytes`, retrying short and interrupted writes.
///
/// # Errors
///
/// Returns `CodecError::Transfer` if the peer stops accepting bytes or the
/// write fails.
pub fn write_fully<W: Write>(writer: &mut W, bytes: &[u8]) -> CodecResult<()> {
    let total = bytes.len();
    let mut written = 0;

    while written < total {
        match writer.write(&bytes[written..]) {
            Ok(0) => {
                return Err(CodecError::Transfer(format!(
                    "connection stopped accepting data after {written} of {total} bytes"
                )))
            }
            Ok(count) => {
                written += count;
                if written < total {
                    tracing::debug!("short write of {count} bytes, {} remaining", total - written);
                }
            }
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
            Err(err) => {
                return Err(CodecError::Transfer(format!(
                    "write failed after {written} of {total} bytes: {err}"
                )))
            }
        }
    }

    writer
        .flush()
        .map_err(|err| CodecError::Transfer(format!("flush failed: {err}")))
}

/// Serializes `request` and writes it to `writer`.
///
/// # Errors
///
/// See [`write_fully`].
pub fn write_request<W: Write>(writer: &mut W, request: &Request, target: &str) -> CodecResult<()> {
    let bytes = serialize_request(request, target);
    tracing::trace!("writing {} byte request for {}", bytes.len(), request.url());
    write_fully(writer, &bytes)
}
