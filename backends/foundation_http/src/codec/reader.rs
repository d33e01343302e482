//! Response parsing: status line, header block and body framing.

use std::io::{self, BufRead, Read};

use super::chunked::ChunkedReader;
use super::content::decode_body;
use super::errors::{ChunkError, CodecError, CodecResult};
use crate::message::{HeaderCollection, HttpMessage, Method, MessageBody, Proto, Response};

/// Longest accepted status or header line.
pub const MAX_LINE: usize = 64 * 1024;

/// Most header lines accepted in one response.
pub const MAX_HEADERS: usize = 256;

/// A parsed response plus whether its connection can carry another exchange.
#[derive(Debug)]
pub struct ReadOutcome {
    pub response: Response,
    pub reusable: bool,
}

/// Reads one raw line including its terminator. `None` means the stream was
/// already at EOF.
fn read_raw_line<R: BufRead>(reader: &mut R) -> CodecResult<Option<Vec<u8>>> {
    let mut line = Vec::new();
    let limit = (MAX_LINE + 2) as u64;
    let read = reader.by_ref().take(limit).read_until(b'\n', &mut line)?;
    if read == 0 {
        return Ok(None);
    }
    if line.last() != Some(&b'\n') && read as u64 >= limit {
        return Err(CodecError::Protocol(format!(
            "line exceeds {MAX_LINE} bytes"
        )));
    }
    Ok(Some(line))
}

/// Strips a trailing `\r\n` or bare `\n`.
fn trim_line(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

/// Parses `HTTP/M.m SP 3DIGIT [SP reason]`.
///
/// # Errors
///
/// Returns `CodecError::Protocol` if the version or status code is invalid.
pub fn parse_status_line(line: &str) -> CodecResult<(Proto, u16, Option<String>)> {
    let invalid = || CodecError::Protocol(format!("invalid status line: {line:?}"));

    let (version, rest) = line.split_once(' ').ok_or_else(invalid)?;
    let version: Proto = version.parse().map_err(|_| invalid())?;

    let rest = rest.trim_start();
    let (code, reason) = match rest.split_once(' ') {
        Some((code, reason)) => (code, reason.trim()),
        None => (rest, ""),
    };

    if code.len() != 3 || !code.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let status = code.parse::<u16>().map_err(|_| invalid())?;

    let reason = if reason.is_empty() {
        None
    } else {
        Some(reason.to_string())
    };
    Ok((version, status, reason))
}

/// Reads header lines up to the blank line, unfolding continuation lines
/// (RFC 2616 section 19.3).
///
/// # Errors
///
/// Returns `CodecError::Protocol` if the block is too large or the stream
/// ends before the blank line.
pub fn read_headers<R: BufRead>(reader: &mut R) -> CodecResult<HeaderCollection> {
    let mut fields: Vec<(String, String)> = Vec::new();
    let mut count = 0;

    loop {
        let Some(raw) = read_raw_line(reader)? else {
            return Err(CodecError::Protocol(
                "connection closed while reading headers".into(),
            ));
        };
        let line = String::from_utf8_lossy(trim_line(&raw)).into_owned();
        if line.is_empty() {
            break;
        }

        count += 1;
        if count > MAX_HEADERS {
            return Err(CodecError::Protocol(format!(
                "more than {MAX_HEADERS} header lines"
            )));
        }

        if line.starts_with([' ', '\t']) {
            match fields.last_mut() {
                Some((_, value)) => {
                    value.push(' ');
                    value.push_str(line.trim());
                }
                None => tracing::warn!("ignoring continuation line before any header: {line:?}"),
            }
            continue;
        }

        match line.split_once(':') {
            Some((name, value)) if !name.trim().is_empty() => {
                fields.push((name.trim().to_string(), value.trim().to_string()));
            }
            _ => tracing::warn!("ignoring malformed header line: {line:?}"),
        }
    }

    Ok(fields.into_iter().collect())
}

/// Reads one complete response for a request sent with `method`.
///
/// `request_close` says the request asked the server to close the
/// connection, which makes a close-delimited body acceptable.
///
/// # Errors
///
/// - `CodecError::Transfer` if the stream ends before a status line or
///   before a framed body is complete.
/// - `CodecError::Protocol` for an unparseable status line or header block.
/// - `CodecError::MalformedChunk` for invalid chunked framing.
/// - `CodecError::IndeterminateLength` for a persistent connection whose
///   response has no length signal.
/// - `CodecError::Decoding` if a supported content-encoding fails.
pub fn read_response<R: BufRead>(
    reader: &mut R,
    method: &Method,
    request_close: bool,
) -> CodecResult<ReadOutcome> {
    let (version, status, message, mut headers) = loop {
        let Some(raw) = read_raw_line(reader)? else {
            return Err(CodecError::Transfer(
                "connection closed before a response was received".into(),
            ));
        };

        let line = trim_line(&raw);
        if line.is_empty() {
            continue;
        }

        if !line.starts_with(b"HTTP/") {
            return read_simple_response(reader, raw);
        }

        let (version, status, message) = parse_status_line(&String::from_utf8_lossy(line))?;
        let headers = read_headers(reader)?;

        if (100..200).contains(&status) && status != 101 {
            tracing::debug!("skipping interim {status} response");
            continue;
        }
        break (version, status, message, headers);
    };

    let mut response = Response::new(status);
    response.set_version(version);
    if let Some(message) = message {
        response.set_message(message);
    }
    *response.headers_mut() = headers.clone();

    let will_close = request_close || !response.is_keep_alive();
    let no_body = *method == Method::HEAD || matches!(status, 100..=199 | 204 | 304);

    let (body, reusable) = if no_body {
        (None, !will_close)
    } else if headers.has_token("transfer-encoding", "chunked") {
        let (body, trailers) = read_chunked(reader)?;
        headers.merge_with(&trailers);
        (Some(body), !will_close)
    } else if let Some(length) = content_length(&headers)? {
        (Some(read_exact_length(reader, length)?), !will_close)
    } else if will_close {
        let mut body = Vec::new();
        reader.read_to_end(&mut body)?;
        (Some(body), false)
    } else {
        return Err(CodecError::IndeterminateLength);
    };

    if let Some(body) = body {
        let decoded = decode_body(&mut headers, body)?;
        response.set_body(MessageBody::from_wire(decoded));
    }
    *response.headers_mut() = headers;

    Ok(ReadOutcome { response, reusable })
}

/// HTTP/0.9: no status line or headers, the whole stream is the body.
fn read_simple_response<R: BufRead>(reader: &mut R, first_line: Vec<u8>) -> CodecResult<ReadOutcome> {
    tracing::debug!("response has no status line, treating it as HTTP/0.9");
    let mut body = first_line;
    reader.read_to_end(&mut body)?;

    let mut response = Response::new(200);
    response.set_version(Proto::HTTP09);
    response.set_body(MessageBody::from_wire(body));
    Ok(ReadOutcome {
        response,
        reusable: false,
    })
}

fn content_length(headers: &HeaderCollection) -> CodecResult<Option<u64>> {
    let Some(values) = headers.get("content-length") else {
        return Ok(None);
    };

    let mut length: Option<u64> = None;
    for value in values.iter().flat_map(|value| value.split(',')) {
        let parsed = value.trim().parse::<u64>().map_err(|_| {
            CodecError::Protocol(format!("invalid Content-Length: {value:?}"))
        })?;
        match length {
            Some(existing) if existing != parsed => {
                return Err(CodecError::Protocol(
                    "conflicting Content-Length values".into(),
                ))
            }
            _ => length = Some(parsed),
        }
    }
    Ok(length)
}

fn read_exact_length<R: BufRead>(reader: &mut R, length: u64) -> CodecResult<Vec<u8>> {
    let mut body = Vec::new();
    reader.by_ref().take(length).read_to_end(&mut body)?;
    if (body.len() as u64) < length {
        return Err(CodecError::Transfer(format!(
            "expected {length} body bytes, received {}",
            body.len()
        )));
    }
    Ok(body)
}

fn read_chunked<R: BufRead>(reader: &mut R) -> CodecResult<(Vec<u8>, HeaderCollection)> {
    let mut chunked = ChunkedReader::new(reader);
    let mut body = Vec::new();
    if let Err(err) = chunked.read_to_end(&mut body) {
        return Err(chunk_read_error(err));
    }
    Ok((body, chunked.into_trailers()))
}

fn chunk_read_error(err: io::Error) -> CodecError {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        return CodecError::Transfer("stream ended inside chunked body".into());
    }
    let chunk_error = err
        .get_ref()
        .and_then(|inner| inner.downcast_ref::<ChunkError>())
        .cloned();
    match chunk_error {
        Some(chunk_error) => CodecError::MalformedChunk(chunk_error),
        None => CodecError::Io(err),
    }
}
