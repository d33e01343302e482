use derive_more::From;

pub type CodecResult<T> = std::result::Result<T, CodecError>;

/// Errors raised by the chunked transfer-coding decoder.
#[derive(From, Debug, Clone, PartialEq, Eq)]
pub enum ChunkError {
    /// The chunk-size field is not a hexadecimal number.
    #[from(ignore)]
    MalformedChunkSize(String),

    /// Chunk data was not followed by CRLF.
    #[from(ignore)]
    MissingChunkTerminator(String),

    /// A chunk-size or trailer line exceeded the allowed length.
    #[from(ignore)]
    LineTooLong(usize),
}

impl std::error::Error for ChunkError {}

impl core::fmt::Display for ChunkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MalformedChunkSize(line) => write!(f, "malformed chunk size line: {line:?}"),
            Self::MissingChunkTerminator(found) => {
                write!(f, "chunk data not terminated by CRLF, found {found:?}")
            }
            Self::LineTooLong(limit) => write!(f, "chunk line longer than {limit} bytes"),
        }
    }
}

/// Errors raised while reading a response off the wire or writing a
/// request onto it.
#[derive(From, Debug)]
pub enum CodecError {
    /// The status line or header block could not be parsed.
    #[from(ignore)]
    Protocol(String),

    MalformedChunk(ChunkError),

    /// The stream ended or stalled before the framed body was complete, or a
    /// write could not be completed.
    #[from(ignore)]
    Transfer(String),

    /// A persistent connection delivered a body with no length signal.
    IndeterminateLength,

    /// A declared content-encoding could not be decoded.
    #[from(ignore)]
    Decoding { encoding: String, reason: String },

    Io(std::io::Error),
}

impl std::error::Error for CodecError {}

impl core::fmt::Display for CodecError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Protocol(reason) => write!(f, "protocol error: {reason}"),
            Self::MalformedChunk(err) => write!(f, "{err}"),
            Self::Transfer(reason) => write!(f, "transfer error: {reason}"),
            Self::IndeterminateLength => write!(
                f,
                "response on a persistent connection has neither Content-Length nor chunked framing"
            ),
            Self::Decoding { encoding, reason } => {
                write!(f, "failed to decode {encoding} content: {reason}")
            }
            Self::Io(err) => write!(f, "i/o error: {err}"),
        }
    }
}
