//! Message bodies and content-type inference.

use std::borrow::Cow;
use std::fmt;
use std::io::{self, Read, Write};

use super::headers::HeaderCollection;
use crate::url::QueryParams;

pub const TEXT_PLAIN: &str = "text/plain";
pub const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";
pub const APPLICATION_XML: &str = "application/xml";

/// Input accepted when constructing a [`MessageBody`].
///
/// Each variant determines the `Content-Type` the body reports.
pub enum BodyContent {
    /// Raw text, sent as `text/plain`.
    Text(String),
    /// Raw bytes, sent as `text/plain`.
    Bytes(Vec<u8>),
    /// A byte stream read to its end, sent as `text/plain`.
    Stream(Box<dyn Read + Send>),
    /// Key-value pairs, sent URL-encoded.
    Form(QueryParams),
    /// A serialized XML document with its declared encoding, if any.
    Xml {
        document: String,
        encoding: Option<String>,
    },
    /// Any other value, serialized through `Display` as `text/plain`.
    Object(Box<dyn fmt::Display + Send>),
}

impl fmt::Debug for BodyContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::Bytes(bytes) => f.debug_tuple("Bytes").field(&bytes.len()).finish(),
            Self::Stream(_) => f.write_str("Stream(..)"),
            Self::Form(params) => f.debug_tuple("Form").field(params).finish(),
            Self::Xml { encoding, .. } => f
                .debug_struct("Xml")
                .field("encoding", encoding)
                .finish_non_exhaustive(),
            Self::Object(_) => f.write_str("Object(..)"),
        }
    }
}

impl From<&str> for BodyContent {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for BodyContent {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Vec<u8>> for BodyContent {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

impl From<&[u8]> for BodyContent {
    fn from(value: &[u8]) -> Self {
        Self::Bytes(value.to_vec())
    }
}

impl From<QueryParams> for BodyContent {
    fn from(value: QueryParams) -> Self {
        Self::Form(value)
    }
}

/// Byte buffer plus the headers that describe it.
///
/// WHY: Requests and responses both carry bodies, and the body is the only
/// part that knows its own content type and length.
///
/// WHAT: A lazily allocated buffer that can be written to and read back.
/// `is_empty` reports whether anything was ever written, so an explicitly
/// empty body (`Content-Length: 0`) is distinguishable from no body.
///
/// HOW: Writes append to the buffer; reads advance a cursor over it, and
/// [`MessageBody::rewind`] resets the cursor.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MessageBody {
    buffer: Option<Vec<u8>>,
    cursor: usize,
    headers: HeaderCollection,
}

impl MessageBody {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a body from `content`, recording the inferred `Content-Type`.
    ///
    /// # Errors
    ///
    /// Returns any I/O error raised while draining a `Stream` input.
    pub fn from_content(content: BodyContent) -> io::Result<Self> {
        Ok(match content {
            BodyContent::Text(text) => Self::with_content(text.as_bytes(), TEXT_PLAIN),
            BodyContent::Bytes(bytes) => Self::with_content(&bytes, TEXT_PLAIN),
            BodyContent::Stream(mut reader) => {
                let mut bytes = Vec::new();
                reader.read_to_end(&mut bytes)?;
                Self::with_content(&bytes, TEXT_PLAIN)
            }
            BodyContent::Form(params) => {
                Self::with_content(params.to_query_string().as_bytes(), FORM_URLENCODED)
            }
            BodyContent::Xml { document, encoding } => match encoding {
                Some(encoding) => Self::with_content(
                    document.as_bytes(),
                    format!("{APPLICATION_XML}; charset={encoding}"),
                ),
                None => Self::with_content(document.as_bytes(), APPLICATION_XML),
            },
            BodyContent::Object(object) => {
                tracing::warn!(
                    "body object has no dedicated encoding; sending its Display form as text/plain"
                );
                Self::with_content(object.to_string().as_bytes(), TEXT_PLAIN)
            }
        })
    }

    fn with_content(bytes: &[u8], content_type: impl Into<String>) -> Self {
        let mut body = Self::new();
        body.append(bytes);
        body.headers.set("Content-Type", content_type);
        body
    }

    /// Wraps bytes received off the wire, without inferring a content type.
    #[must_use]
    pub fn from_wire(bytes: Vec<u8>) -> Self {
        Self {
            buffer: Some(bytes),
            cursor: 0,
            headers: HeaderCollection::new(),
        }
    }

    fn append(&mut self, bytes: &[u8]) {
        self.buffer.get_or_insert_with(Vec::new).extend_from_slice(bytes);
    }

    /// True until something has been written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_none()
    }

    /// Number of bytes held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buffer.as_ref().map_or(0, Vec::len)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.buffer.as_deref().unwrap_or_default()
    }

    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer.unwrap_or_default()
    }

    /// Returns the content as text, replacing invalid UTF-8.
    #[must_use]
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.as_bytes())
    }

    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.headers.first("content-type")
    }

    /// Headers describing the body (`Content-Type`).
    #[must_use]
    pub fn headers(&self) -> &HeaderCollection {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderCollection {
        &mut self.headers
    }

    /// Resets the read cursor to the start of the content.
    pub fn rewind(&mut self) {
        self.cursor = 0;
    }

    /// Drops all content, returning the body to its never-written state.
    pub fn clear(&mut self) {
        self.buffer = None;
        self.cursor = 0;
        self.headers = HeaderCollection::new();
    }
}

impl Read for MessageBody {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let bytes = self.as_bytes();
        let remaining = &bytes[self.cursor.min(bytes.len())..];
        let count = remaining.len().min(buf.len());
        buf[..count].copy_from_slice(&remaining[..count]);
        self.cursor += count;
        Ok(count)
    }
}

impl Write for MessageBody {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.append(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl From<&str> for MessageBody {
    fn from(value: &str) -> Self {
        Self::with_content(value.as_bytes(), TEXT_PLAIN)
    }
}

impl From<String> for MessageBody {
    fn from(value: String) -> Self {
        Self::with_content(value.as_bytes(), TEXT_PLAIN)
    }
}

impl From<Vec<u8>> for MessageBody {
    fn from(value: Vec<u8>) -> Self {
        Self::with_content(&value, TEXT_PLAIN)
    }
}

impl From<&[u8]> for MessageBody {
    fn from(value: &[u8]) -> Self {
        Self::with_content(value, TEXT_PLAIN)
    }
}

impl From<QueryParams> for MessageBody {
    fn from(value: QueryParams) -> Self {
        Self::with_content(value.to_query_string().as_bytes(), FORM_URLENCODED)
    }
}
