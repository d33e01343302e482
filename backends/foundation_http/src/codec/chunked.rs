//! Incremental decoder for the chunked transfer coding (RFC 7230 section 4.1).
//
//     chunked-body   = *chunk
//                      last-chunk
//                      trailer-part
//                      CRLF
//
//     chunk          = chunk-size [ chunk-ext ] CRLF
//                      chunk-data CRLF
//     chunk-size     = 1*HEXDIG
//     last-chunk     = 1*("0") [ chunk-ext ] CRLF
//
//     chunk-data     = 1*OCTET ; a sequence of chunk-size octets
//
// Chunk extensions are logged and discarded.

use std::io::{self, BufRead, Read};

use memchr::memchr;

use super::errors::ChunkError;
use crate::message::HeaderCollection;

/// Longest accepted chunk-size line, extensions included.
pub const MAX_CHUNK_LINE: usize = 4 * 1024;

/// Longest accepted trailer line.
pub const MAX_TRAILER_LINE: usize = 64 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChunkState {
    /// Reading the hex size line.
    ChunkLine,
    /// Copying chunk data.
    DataChunk { remaining: u64 },
    /// Expecting the CRLF that closes a chunk's data.
    DataEnd,
    /// Reading trailer header lines up to the blank line.
    Trailer,
    Done,
}

/// Push-style decoder: feed it buffers of any size, collect decoded bytes.
///
/// WHY: Socket reads return arbitrary slices of the stream, so chunk-size
/// lines and CRLFs can be split across reads.
///
/// WHAT: Keeps partial lines between calls, copies chunk data straight to
/// the output and collects trailer headers. Stops consuming input once the
/// terminating blank line is seen, so bytes belonging to a following
/// response stay unconsumed.
///
/// HOW: A small state machine driven by [`ChunkDecoder::decode`], which
/// reports how many input bytes it consumed.
///
/// # Examples
///
/// ```
/// use foundation_http::codec::ChunkDecoder;
///
/// let mut decoder = ChunkDecoder::new();
/// let mut out = Vec::new();
/// decoder.decode(b"6\r\nhello \r\n6\r\nwor", &mut out).unwrap();
/// decoder.decode(b"ld!\r\n0\r\n\r\n", &mut out).unwrap();
/// assert_eq!(out, b"hello world!");
/// assert!(decoder.is_done());
/// ```
#[derive(Debug, Clone)]
pub struct ChunkDecoder {
    state: ChunkState,
    line: Vec<u8>,
    trailers: HeaderCollection,
}

impl Default for ChunkDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ChunkDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: ChunkState::ChunkLine,
            line: Vec::new(),
            trailers: HeaderCollection::new(),
        }
    }

    /// True once the last chunk and trailers have been consumed.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.state == ChunkState::Done
    }

    /// Trailer headers seen so far.
    #[must_use]
    pub fn trailers(&self) -> &HeaderCollection {
        &self.trailers
    }

    pub fn take_trailers(&mut self) -> HeaderCollection {
        std::mem::take(&mut self.trailers)
    }

    /// Decodes as much of `input` as possible, appending body bytes to
    /// `output`. Returns the number of input bytes consumed, which is less
    /// than `input.len()` only when the body ended inside `input`.
    ///
    /// # Errors
    ///
    /// Returns `ChunkError::MalformedChunkSize` for a non-hex size,
    /// `ChunkError::MissingChunkTerminator` when chunk data is not followed by
    /// CRLF and `ChunkError::LineTooLong` when a line exceeds its limit.
    pub fn decode(&mut self, input: &[u8], output: &mut Vec<u8>) -> Result<usize, ChunkError> {
        let mut position = 0;

        while position < input.len() {
            match self.state {
                ChunkState::ChunkLine => {
                    let (consumed, line) = self.take_line(&input[position..], MAX_CHUNK_LINE)?;
                    position += consumed;
                    if let Some(line) = line {
                        let size = parse_chunk_size(&line)?;
                        self.state = if size == 0 {
                            ChunkState::Trailer
                        } else {
                            ChunkState::DataChunk { remaining: size }
                        };
                    }
                }
                ChunkState::DataChunk { remaining } => {
                    let available = input.len() - position;
                    let take = usize::try_from(remaining).map_or(available, |r| r.min(available));
                    output.extend_from_slice(&input[position..position + take]);
                    position += take;

                    let left = remaining - take as u64;
                    self.state = if left == 0 {
                        ChunkState::DataEnd
                    } else {
                        ChunkState::DataChunk { remaining: left }
                    };
                }
                ChunkState::DataEnd => {
                    let (consumed, line) = self.take_line(&input[position..], MAX_CHUNK_LINE)?;
                    position += consumed;
                    if let Some(line) = line {
                        if !line.is_empty() {
                            return Err(ChunkError::MissingChunkTerminator(line));
                        }
                        self.state = ChunkState::ChunkLine;
                    }
                }
                ChunkState::Trailer => {
                    let (consumed, line) = self.take_line(&input[position..], MAX_TRAILER_LINE)?;
                    position += consumed;
                    if let Some(line) = line {
                        if line.is_empty() {
                            self.state = ChunkState::Done;
                        } else {
                            self.add_trailer(&line);
                        }
                    }
                }
                ChunkState::Done => break,
            }
        }

        Ok(position)
    }

    /// Accumulates bytes up to the next `\n`. Returns the bytes consumed and
    /// the completed line, without its CRLF, once one is available.
    fn take_line(&mut self, input: &[u8], limit: usize) -> Result<(usize, Option<String>), ChunkError> {
        match memchr(b'\n', input) {
            Some(index) => {
                self.line.extend_from_slice(&input[..index]);
                if self.line.len() > limit {
                    return Err(ChunkError::LineTooLong(limit));
                }
                if self.line.last() == Some(&b'\r') {
                    self.line.pop();
                }
                let line = String::from_utf8_lossy(&self.line).into_owned();
                self.line.clear();
                Ok((index + 1, Some(line)))
            }
            None => {
                self.line.extend_from_slice(input);
                if self.line.len() > limit {
                    return Err(ChunkError::LineTooLong(limit));
                }
                Ok((input.len(), None))
            }
        }
    }

    fn add_trailer(&mut self, line: &str) {
        match line.split_once(':') {
            Some((name, value)) if !name.trim().is_empty() => {
                self.trailers.add(name.trim(), value.trim());
            }
            _ => tracing::warn!("ignoring malformed trailer line: {line:?}"),
        }
    }
}

fn parse_chunk_size(line: &str) -> Result<u64, ChunkError> {
    let (size, extension) = match line.split_once(';') {
        Some((size, extension)) => (size, Some(extension)),
        None => (line, None),
    };

    if let Some(extension) = extension {
        tracing::debug!("discarding chunk extension: {:?}", extension.trim());
    }

    let size = size.trim();
    if size.is_empty() || !size.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(ChunkError::MalformedChunkSize(line.to_string()));
    }

    u64::from_str_radix(size, 16).map_err(|_| ChunkError::MalformedChunkSize(line.to_string()))
}

/// Pull-style adapter: reads a chunked body from a buffered stream.
///
/// Only the bytes belonging to the chunked body are consumed from `inner`,
/// so a persistent connection can carry on with the next response.
pub struct ChunkedReader<R: BufRead> {
    inner: R,
    decoder: ChunkDecoder,
    pending: Vec<u8>,
    pending_position: usize,
}

impl<R: BufRead> ChunkedReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            decoder: ChunkDecoder::new(),
            pending: Vec::new(),
            pending_position: 0,
        }
    }

    /// Trailer headers, complete once the reader returned `Ok(0)`.
    pub fn trailers(&self) -> &HeaderCollection {
        self.decoder.trailers()
    }

    pub fn into_trailers(mut self) -> HeaderCollection {
        self.decoder.take_trailers()
    }
}

impl<R: BufRead> Read for ChunkedReader<R> {
    /// # Errors
    ///
    /// Decoder failures surface as `InvalidData` wrapping a [`ChunkError`];
    /// a stream that ends before the last chunk yields `UnexpectedEof`.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        while self.pending_position >= self.pending.len() {
            if self.decoder.is_done() {
                return Ok(0);
            }

            self.pending.clear();
            self.pending_position = 0;

            let available = self.inner.fill_buf()?;
            if available.is_empty() {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "stream ended before the last chunk",
                ));
            }

            let consumed = self
                .decoder
                .decode(available, &mut self.pending)
                .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
            self.inner.consume(consumed);
        }

        let remaining = &self.pending[self.pending_position..];
        let count = remaining.len().min(buf.len());
        buf[..count].copy_from_slice(&remaining[..count]);
        self.pending_position += count;
        Ok(count)
    }
}
