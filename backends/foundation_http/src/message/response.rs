//! Incoming HTTP responses.

use std::sync::Arc;

use super::body::MessageBody;
use super::headers::HeaderCollection;
use super::proto::Proto;
use super::request::Request;
use super::status::{reason_phrase, StatusClass};
use super::HttpMessage;

/// An HTTP response with a back-reference to the request that produced it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Response {
    status: u16,
    message: Option<String>,
    version: Proto,
    headers: HeaderCollection,
    body: MessageBody,
    request: Option<Arc<Request>>,
}

impl Response {
    #[must_use]
    pub fn new(status: u16) -> Self {
        Self {
            status,
            message: None,
            version: Proto::HTTP11,
            headers: HeaderCollection::new(),
            body: MessageBody::new(),
            request: None,
        }
    }

    #[must_use]
    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn set_status(&mut self, status: u16) {
        self.status = status;
    }

    /// The reason phrase the server sent, if any.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn set_message(&mut self, message: impl Into<String>) {
        let message = message.into();
        self.message = if message.is_empty() {
            None
        } else {
            Some(message)
        };
    }

    /// The server's reason phrase, or the canonical one for the status.
    #[must_use]
    pub fn status_text(&self) -> &str {
        self.message
            .as_deref()
            .or_else(|| reason_phrase(self.status))
            .unwrap_or("")
    }

    #[must_use]
    pub fn request(&self) -> Option<&Request> {
        self.request.as_deref()
    }

    pub fn set_request(&mut self, request: Arc<Request>) {
        self.request = Some(request);
    }

    pub fn set_body(&mut self, body: MessageBody) {
        self.body = body;
    }

    #[must_use]
    pub fn class(&self) -> StatusClass {
        StatusClass::of(self.status)
    }

    #[must_use]
    pub fn is_informational(&self) -> bool {
        self.class() == StatusClass::Informational
    }

    /// 2xx, plus 304.
    #[must_use]
    pub fn is_successful(&self) -> bool {
        self.class() == StatusClass::Successful
    }

    /// 3xx except 304.
    #[must_use]
    pub fn is_redirect(&self) -> bool {
        self.class() == StatusClass::Redirect
    }

    #[must_use]
    pub fn is_client_error(&self) -> bool {
        self.class() == StatusClass::ClientError
    }

    #[must_use]
    pub fn is_server_error(&self) -> bool {
        self.class() == StatusClass::ServerError
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        self.is_client_error() || self.is_server_error()
    }

    #[must_use]
    pub fn is_unknown(&self) -> bool {
        self.class() == StatusClass::Unknown
    }

    /// True for `304 Not Modified`.
    #[must_use]
    pub fn is_cached(&self) -> bool {
        self.status == 304
    }

    #[must_use]
    pub fn etag(&self) -> Option<&str> {
        self.headers.first("etag")
    }

    #[must_use]
    pub fn last_modified(&self) -> Option<&str> {
        self.headers.first("last-modified")
    }

    /// True when the request was cacheable and the response carries a
    /// validator (`ETag` or `Last-Modified`).
    #[must_use]
    pub fn is_cacheable(&self) -> bool {
        self.request().is_some_and(Request::is_cacheable)
            && (self.etag().is_some() || self.last_modified().is_some())
    }

    /// Whether the server intends to keep the connection open.
    #[must_use]
    pub fn is_keep_alive(&self) -> bool {
        if self.headers.has_token("connection", "close") {
            return false;
        }
        self.version.persistent_by_default() || self.headers.has_token("connection", "keep-alive")
    }
}

impl HttpMessage for Response {
    fn version(&self) -> Proto {
        self.version
    }

    fn set_version(&mut self, version: Proto) {
        self.version = version;
    }

    fn headers(&self) -> &HeaderCollection {
        &self.headers
    }

    fn headers_mut(&mut self) -> &mut HeaderCollection {
        &mut self.headers
    }

    fn body(&self) -> &MessageBody {
        &self.body
    }

    fn body_mut(&mut self) -> &mut MessageBody {
        &mut self.body
    }
}
