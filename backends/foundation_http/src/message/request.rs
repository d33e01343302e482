//! Outgoing HTTP requests.

use super::body::MessageBody;
use super::errors::{MessageError, MessageResult};
use super::headers::HeaderCollection;
use super::method::Method;
use super::proto::Proto;
use super::response::Response;
use super::HttpMessage;
use crate::url::{InvalidUrl, IntoUrl, Url};

/// An HTTP request: target URL, method, version, headers and body.
///
/// WHY: The client, the connector and the redirect loop all pass requests
/// around and derive new ones from them, so a request is a plain owned value.
///
/// WHAT: Defaults to `GET` over HTTP/1.1 with no body. Bodies are refused on
/// `GET`. Caching can be disabled per request.
///
/// HOW: Headers set on the request always win; the client and the connector
/// only fill in headers that are absent.
///
/// # Examples
///
/// ```
/// use foundation_http::message::{HttpMessage, Method, Request};
///
/// let mut request = Request::new("http://example.org/submit", Method::POST).unwrap();
/// request.set_body("name=value").unwrap();
/// assert_eq!(request.headers().first("content-length"), Some("10"));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Request {
    url: Url,
    method: Method,
    version: Proto,
    headers: HeaderCollection,
    body: MessageBody,
    caching_disabled: bool,
}

impl Request {
    /// Creates a request for `target` with `method`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidUrl::Malformed` if `target` does not parse.
    pub fn new<U: IntoUrl>(target: U, method: Method) -> Result<Self, InvalidUrl> {
        Ok(Self::from_url(target.into_url()?, method))
    }

    /// Creates a `GET` request for `target`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidUrl::Malformed` if `target` does not parse.
    pub fn get<U: IntoUrl>(target: U) -> Result<Self, InvalidUrl> {
        Self::new(target, Method::GET)
    }

    #[must_use]
    pub fn from_url(url: Url, method: Method) -> Self {
        Self {
            url,
            method,
            version: Proto::HTTP11,
            headers: HeaderCollection::new(),
            body: MessageBody::new(),
            caching_disabled: false,
        }
    }

    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn url_mut(&mut self) -> &mut Url {
        &mut self.url
    }

    pub fn set_url(&mut self, url: Url) {
        self.url = url;
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn set_method(&mut self, method: Method) {
        self.method = method;
    }

    /// Attaches `body`, setting `Content-Length` and, when absent,
    /// `Content-Type` from the body.
    ///
    /// # Errors
    ///
    /// Returns `MessageError::InvalidOperation` for `GET` requests.
    pub fn set_body(&mut self, body: impl Into<MessageBody>) -> MessageResult<()> {
        if self.method == Method::GET {
            return Err(MessageError::InvalidOperation(
                "GET requests cannot carry a body".into(),
            ));
        }

        let body = body.into();
        self.headers.set("Content-Length", body.len().to_string());
        if let Some(content_type) = body.content_type() {
            self.headers.set_default("Content-Type", content_type);
        }
        self.body = body;
        Ok(())
    }

    /// Removes the body and the headers describing it.
    pub fn clear_body(&mut self) {
        self.body.clear();
        self.headers.remove("content-length");
        self.headers.remove("content-type");
    }

    /// Marks the request as not eligible for validator caching.
    pub fn disable_caching(&mut self) {
        self.caching_disabled = true;
    }

    /// True for `GET`/`HEAD` requests over HTTP/1.0 or later that have not
    /// disabled caching.
    #[must_use]
    pub fn is_cacheable(&self) -> bool {
        self.version >= Proto::HTTP10
            && matches!(self.method, Method::GET | Method::HEAD)
            && !self.caching_disabled
    }

    /// Tunnels methods other than `GET`, `HEAD` and `POST` through `POST`,
    /// recording the real method in `header_name`.
    pub fn override_method(&mut self, header_name: &str) {
        if matches!(self.method, Method::GET | Method::HEAD | Method::POST) {
            return;
        }
        self.headers.set(header_name, self.method.as_str());
        self.method = Method::POST;
    }

    /// Builds the follow-up request for a redirect `response`.
    ///
    /// The `Location` header is resolved against the originating request's
    /// URL. Method, headers and body carry over; `Host` is dropped so it is
    /// recomputed, and `Authorization` is dropped when the host changes.
    ///
    /// # Errors
    ///
    /// Returns `MessageError::MissingRedirectLocation` without a `Location`
    /// header, `MessageError::InvalidLocation` if it does not resolve, and
    /// `MessageError::InvalidOperation` if the response has no request.
    pub fn from_redirect(response: &Response) -> MessageResult<Request> {
        let location = response
            .headers()
            .first("location")
            .ok_or(MessageError::MissingRedirectLocation)?;

        let original = response.request().ok_or_else(|| {
            MessageError::InvalidOperation("redirect response has no originating request".into())
        })?;

        let target = original.url.resolve(location.trim())?;

        let mut request = original.clone();
        request.headers.remove("host");
        if target.host_header() != original.url.host_header() {
            request.headers.remove("authorization");
        }
        request.url = target;
        Ok(request)
    }
}

impl HttpMessage for Request {
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

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn redirect_to(request: Request, status: u16, location: Option<&str>) -> Response {
        let mut response = Response::new(status);
        if let Some(location) = location {
            response.headers_mut().set("Location", location);
        }
        response.set_request(Arc::new(request));
        response
    }

    #[test]
    fn test_defaults() {
        let request = Request::get("http://example.org/").unwrap();
        assert_eq!(request.method(), &Method::GET);
        assert_eq!(request.version(), Proto::HTTP11);
        assert!(request.body().is_empty());
        assert!(request.is_cacheable());
    }

    /// WHY: GET requests must not carry a body.
    /// WHAT: set_body on GET fails, on POST it sets Content-Length.
    #[test]
    fn test_set_body_rejected_on_get() {
        let mut request = Request::get("http://example.org/").unwrap();
        assert!(matches!(
            request.set_body("payload"),
            Err(MessageError::InvalidOperation(_))
        ));

        let mut request = Request::new("http://example.org/", Method::POST).unwrap();
        request.set_body("payload").unwrap();
        assert_eq!(request.headers().first("Content-Length"), Some("7"));
        assert_eq!(request.headers().first("Content-Type"), Some("text/plain"));
    }

    #[test]
    fn test_set_body_keeps_explicit_content_type() {
        let mut request = Request::new("http://example.org/", Method::PUT).unwrap();
        request.headers_mut().set("Content-Type", "application/json");
        request.set_body("{}").unwrap();
        assert_eq!(
            request.headers().first("content-type"),
            Some("application/json")
        );
    }

    #[test]
    fn test_cacheability() {
        let mut request = Request::new("http://example.org/", Method::HEAD).unwrap();
        assert!(request.is_cacheable());
        request.disable_caching();
        assert!(!request.is_cacheable());

        let request = Request::new("http://example.org/", Method::POST).unwrap();
        assert!(!request.is_cacheable());

        let mut request = Request::get("http://example.org/").unwrap();
        request.set_version(Proto::HTTP09);
        assert!(!request.is_cacheable());
    }

    #[test]
    fn test_override_method() {
        let mut request = Request::new("http://example.org/", Method::DELETE).unwrap();
        request.override_method("X-HTTP-Method-Override");
        assert_eq!(request.method(), &Method::POST);
        assert_eq!(
            request.headers().first("x-http-method-override"),
            Some("DELETE")
        );

        let mut request = Request::new("http://example.org/", Method::POST).unwrap();
        request.override_method("X-HTTP-Method-Override");
        assert_eq!(request.method(), &Method::POST);
        assert!(!request.headers().contains("x-http-method-override"));
    }

    #[test]
    fn test_from_redirect_requires_location() {
        let request = Request::get("http://example.org/").unwrap();
        let response = redirect_to(request, 302, None);
        assert_eq!(
            Request::from_redirect(&response),
            Err(MessageError::MissingRedirectLocation)
        );
    }

    #[test]
    fn test_from_redirect_preserves_method_and_body() {
        let mut request = Request::new("http://example.org/a/b", Method::POST).unwrap();
        request.set_body("data").unwrap();
        request.headers_mut().set("X-Trace", "1");
        request.headers_mut().set("Host", "example.org");

        let response = redirect_to(request, 307, Some("../c?x=1"));
        let next = Request::from_redirect(&response).unwrap();
        assert_eq!(next.url().to_string(), "http://example.org/c?x=1");
        assert_eq!(next.method(), &Method::POST);
        assert_eq!(next.body().as_bytes(), b"data");
        assert_eq!(next.headers().first("x-trace"), Some("1"));
        assert!(!next.headers().contains("host"));
    }

    #[test]
    fn test_from_redirect_strips_authorization_across_hosts() {
        let mut request = Request::get("http://example.org/").unwrap();
        request.headers_mut().set("Authorization", "Basic abc");

        let same_host = redirect_to(request.clone(), 301, Some("/moved"));
        let next = Request::from_redirect(&same_host).unwrap();
        assert!(next.headers().contains("authorization"));

        let other_host = redirect_to(request, 301, Some("http://elsewhere.org/"));
        let next = Request::from_redirect(&other_host).unwrap();
        assert!(!next.headers().contains("authorization"));
    }
}
