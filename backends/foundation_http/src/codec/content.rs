//! Content-Encoding decoders.
//!
//! Which decoders exist depends on the compiled features: `gzip` and
//! `deflate` use flate2, `bzip2` uses bzip2 and `brotli` uses brotli.
//! [`accept_encoding`] advertises exactly the compiled-in set.

#[cfg(any(feature = "gzip", feature = "deflate", feature = "bzip2", feature = "brotli"))]
use std::io::Read;

use super::errors::{CodecError, CodecResult};
use crate::message::HeaderCollection;

/// Returns the `Accept-Encoding` value for the compiled-in decoders, or
/// `None` when no decoder is available.
#[must_use]
pub fn accept_encoding() -> Option<String> {
    let mut encodings: Vec<&str> = Vec::new();
    if cfg!(feature = "gzip") {
        encodings.push("gzip");
    }
    if cfg!(feature = "deflate") {
        encodings.push("deflate");
    }
    if cfg!(feature = "bzip2") {
        encodings.push("bzip2");
    }
    if cfg!(feature = "brotli") {
        encodings.push("br");
    }

    if encodings.is_empty() {
        None
    } else {
        Some(encodings.join(", "))
    }
}

/// Decodes `body` according to the response's `Content-Encoding` header.
///
/// Encodings are listed in the order they were applied, so they are undone
/// in reverse. Decoding stops at the first unknown encoding, which is logged,
/// and the bytes decoded so far are passed through. `Content-Encoding` is
/// then rewritten to the encodings still applied. `Content-Length` is removed
/// whenever any layer was undone.
///
/// # Errors
///
/// Returns `CodecError::Decoding` when a supported encoding fails to decode.
pub fn decode_body(headers: &mut HeaderCollection, body: Vec<u8>) -> CodecResult<Vec<u8>> {
    let Some(header) = headers.get_joined("content-encoding") else {
        return Ok(body);
    };

    let encodings: Vec<String> = header
        .split(',')
        .map(|encoding| encoding.trim().to_ascii_lowercase())
        .filter(|encoding| !encoding.is_empty())
        .collect();

    let mut data = body;
    for (index, encoding) in encodings.iter().enumerate().rev() {
        match decode_one(encoding, data)? {
            Decoded::Done(decoded) => data = decoded,
            Decoded::Unsupported(raw) => {
                tracing::warn!("unsupported content-encoding {encoding:?}, passing body through");
                if index + 1 < encodings.len() {
                    headers.set("Content-Encoding", encodings[..=index].join(", "));
                    headers.remove("content-length");
                }
                return Ok(raw);
            }
        }
    }

    headers.remove("content-encoding");
    headers.remove("content-length");
    Ok(data)
}

enum Decoded {
    Done(Vec<u8>),
    Unsupported(Vec<u8>),
}

fn decode_one(encoding: &str, data: Vec<u8>) -> CodecResult<Decoded> {
    match encoding {
        "identity" => Ok(Decoded::Done(data)),
        #[cfg(feature = "gzip")]
        "gzip" | "x-gzip" => {
            read_all(encoding, flate2::read::MultiGzDecoder::new(data.as_slice())).map(Decoded::Done)
        }
        #[cfg(feature = "deflate")]
        "deflate" => inflate(&data).map(Decoded::Done),
        #[cfg(feature = "bzip2")]
        "bzip2" | "x-bzip2" => {
            read_all(encoding, bzip2::read::BzDecoder::new(data.as_slice())).map(Decoded::Done)
        }
        #[cfg(feature = "brotli")]
        "br" => read_all(encoding, brotli::Decompressor::new(data.as_slice(), 4096))
            .map(Decoded::Done),
        _ => Ok(Decoded::Unsupported(data)),
    }
}

/// Servers disagree on whether `deflate` means a zlib stream (RFC 1950) or
/// raw deflate (RFC 1951); a zlib header is recognized by its first two
/// bytes.
#[cfg(feature = "deflate")]
fn inflate(data: &[u8]) -> CodecResult<Vec<u8>> {
    if has_zlib_header(data) {
        read_all("deflate", flate2::read::ZlibDecoder::new(data))
    } else {
        read_all("deflate", flate2::read::DeflateDecoder::new(data))
    }
}

/// CMF byte with compression method 8, and CMF/FLG forming a multiple of 31.
#[cfg(feature = "deflate")]
fn has_zlib_header(data: &[u8]) -> bool {
    match data {
        [cmf, flg, ..] => cmf & 0x0F == 8 && ((u16::from(*cmf) << 8) | u16::from(*flg)) % 31 == 0,
        _ => false,
    }
}

#[cfg(any(feature = "gzip", feature = "deflate", feature = "bzip2", feature = "brotli"))]
fn read_all<R: Read>(encoding: &str, mut reader: R) -> CodecResult<Vec<u8>> {
    let mut decoded = Vec::new();
    reader
        .read_to_end(&mut decoded)
        .map_err(|err| CodecError::Decoding {
            encoding: encoding.to_string(),
            reason: err.to_string(),
        })?;
    Ok(decoded)
}
