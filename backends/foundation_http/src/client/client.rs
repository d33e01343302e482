//! High-level HTTP client.
//!
//! WHY: Callers want to say "GET this URL" and get the final response,
//! without repeating default headers or chasing redirects by hand.
//!
//! WHAT: [`HttpClient`] validates the scheme, merges client-wide headers,
//! delegates to a [`Connector`] and follows redirects within a fixed budget.
//!
//! HOW: The redirect loop is an explicit loop with a counter; each hop is
//! derived from the previous response by [`Request::from_redirect`].

use std::sync::Arc;

use super::cache::ValidatorCache;
use super::config::ClientConfig;
use super::connector::{Connector, StreamConnector};
use super::errors::{HttpClientError, HttpClientResult};
use super::proxy::ProxyingConnector;
use crate::message::{HttpMessage, Method, Request, Response};
use crate::url::{Url, UrlParts};

/// Anything the verb helpers accept as a request: a ready [`Request`] or
/// something that becomes a URL.
pub trait IntoRequest {
    /// # Errors
    ///
    /// Returns `HttpClientError::MalformedUrl` if the target does not parse.
    fn into_request(self) -> HttpClientResult<Request>;
}

impl IntoRequest for Request {
    fn into_request(self) -> HttpClientResult<Request> {
        Ok(self)
    }
}

impl IntoRequest for Url {
    fn into_request(self) -> HttpClientResult<Request> {
        Ok(Request::from_url(self, Method::GET))
    }
}

impl IntoRequest for &Url {
    fn into_request(self) -> HttpClientResult<Request> {
        Ok(Request::from_url(self.clone(), Method::GET))
    }
}

impl IntoRequest for &str {
    fn into_request(self) -> HttpClientResult<Request> {
        Ok(Request::get(self)?)
    }
}

impl IntoRequest for String {
    fn into_request(self) -> HttpClientResult<Request> {
        Ok(Request::get(self)?)
    }
}

impl IntoRequest for UrlParts {
    fn into_request(self) -> HttpClientResult<Request> {
        Ok(Request::get(self)?)
    }
}

/// Blocking HTTP client.
///
/// # Examples
///
/// ```no_run
/// use foundation_http::client::HttpClient;
///
/// let client = HttpClient::new();
/// let response = client.get("http://example.org/").unwrap();
/// println!("{} {}", response.status(), response.status_text());
/// ```
pub struct HttpClient<C: Connector = StreamConnector> {
    connector: C,
    config: ClientConfig,
}

impl<C: Connector + std::fmt::Debug> std::fmt::Debug for HttpClient<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("connector", &self.connector)
            .field("config", &self.config)
            .finish()
    }
}

impl HttpClient<StreamConnector> {
    /// A client with default settings and a non-pooling stream connector.
    #[must_use]
    pub fn new() -> Self {
        let config = ClientConfig::default();
        Self::with_connector(StreamConnector::from_config(config.connector.clone()), config)
    }
}

impl Default for HttpClient<StreamConnector> {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient<Box<dyn Connector>> {
    /// Builds the connector stack described by `config`: a stream connector,
    /// wrapped in a proxying connector when a proxy is configured.
    #[must_use]
    pub fn from_config(config: ClientConfig) -> Self {
        Self::from_config_with_cache(config, None)
    }

    /// Like [`HttpClient::from_config`], storing validators in `cache`.
    #[must_use]
    pub fn from_config_with_cache(config: ClientConfig, cache: Option<Arc<dyn ValidatorCache>>) -> Self {
        let mut stream = StreamConnector::from_config(config.connector.clone());
        if let Some(cache) = cache {
            stream = stream.with_cache(cache);
        }

        let connector: Box<dyn Connector> = match config.connector.proxy.clone() {
            Some(proxy) => Box::new(ProxyingConnector::new(stream, proxy)),
            None => Box::new(stream),
        };
        Self::with_connector(connector, config)
    }
}

impl<C: Connector> HttpClient<C> {
    pub fn with_connector(connector: C, config: ClientConfig) -> Self {
        Self { connector, config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Sends `request`, following redirects when enabled.
    ///
    /// # Errors
    ///
    /// - `HttpClientError::UnsupportedProtocol` if the URL (or a redirect
    ///   target) is not http or https.
    /// - `HttpClientError::TooManyRedirects` once `max_redirects + 1`
    ///   requests have been answered with redirects.
    /// - `HttpClientError::MissingRedirectLocation` for a redirect without
    ///   `Location`.
    /// - Any error returned by the connector.
    pub fn send(&self, request: Request) -> HttpClientResult<Response> {
        let mut request = request;
        check_scheme(request.url())?;
        self.apply_defaults(&mut request);

        let max_attempts = self.config.max_redirects + 1;
        let mut attempts = 0;

        loop {
            attempts += 1;
            let response = self.connector.send(&request)?;

            if !self.config.follow_redirects || !response.is_redirect() {
                return Ok(response);
            }
            if attempts >= max_attempts {
                return Err(HttpClientError::TooManyRedirects(attempts));
            }

            let mut next = Request::from_redirect(&response)?;
            if self.config.see_other_as_get && response.status() == 303 {
                next.set_method(Method::GET);
                next.clear_body();
            }
            check_scheme(next.url())?;

            tracing::debug!(
                "following {} redirect from {} to {}",
                response.status(),
                request.url(),
                next.url()
            );
            request = next;
        }
    }

    /// Fills in `User-Agent`, `Accept` and the configured default headers
    /// where the request has none, then applies the method override.
    fn apply_defaults(&self, request: &mut Request) {
        let headers = request.headers_mut();
        headers.set_default("User-Agent", self.config.user_agent());
        headers.set_default("Accept", self.config.accept.clone());
        headers.merge_missing(&self.config.default_headers);

        if let Some(header) = &self.config.method_override_header {
            request.override_method(header);
        }
    }

    fn send_as(&self, target: impl IntoRequest, method: Method) -> HttpClientResult<Response> {
        let mut request = target.into_request()?;
        if matches!(method, Method::GET | Method::HEAD) {
            request.clear_body();
        }
        request.set_method(method);
        self.send(request)
    }

    /// # Errors
    ///
    /// See [`HttpClient::send`].
    pub fn get(&self, target: impl IntoRequest) -> HttpClientResult<Response> {
        self.send_as(target, Method::GET)
    }

    /// # Errors
    ///
    /// See [`HttpClient::send`].
    pub fn head(&self, target: impl IntoRequest) -> HttpClientResult<Response> {
        self.send_as(target, Method::HEAD)
    }

    /// # Errors
    ///
    /// See [`HttpClient::send`].
    pub fn post(&self, target: impl IntoRequest) -> HttpClientResult<Response> {
        self.send_as(target, Method::POST)
    }

    /// # Errors
    ///
    /// See [`HttpClient::send`].
    pub fn put(&self, target: impl IntoRequest) -> HttpClientResult<Response> {
        self.send_as(target, Method::PUT)
    }

    /// # Errors
    ///
    /// See [`HttpClient::send`].
    pub fn delete(&self, target: impl IntoRequest) -> HttpClientResult<Response> {
        self.send_as(target, Method::DELETE)
    }
}

fn check_scheme(url: &Url) -> HttpClientResult<()> {
    match url.scheme() {
        Some(scheme) if scheme.is_http() || scheme.is_https() => Ok(()),
        Some(scheme) => Err(HttpClientError::UnsupportedProtocol(scheme.as_str().to_string())),
        None => Err(HttpClientError::UnsupportedProtocol(String::new())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MessageBody;
    use std::sync::Mutex;
    use tracing_test::traced_test;

    /// Records every request and answers from a script, repeating the last
    /// response once the script runs out.
    struct ScriptedConnector {
        responses: Mutex<Vec<Response>>,
        seen: Mutex<Vec<Request>>,
    }

    impl ScriptedConnector {
        fn new(responses: Vec<Response>) -> Self {
            Self {
                responses: Mutex::new(responses),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn seen(&self) -> Vec<Request> {
            self.seen.lock().unwrap().clone()
        }
    }

    impl Connector for ScriptedConnector {
        fn send(&self, request: &Request) -> HttpClientResult<Response> {
            self.seen.lock().unwrap().push(request.clone());
            let mut responses = self.responses.lock().unwrap();
            let mut response = if responses.len() > 1 {
                responses.remove(0)
            } else {
                responses[0].clone()
            };
            response.set_request(Arc::new(request.clone()));
            Ok(response)
        }
    }

    fn redirect(status: u16, location: &str) -> Response {
        let mut response = Response::new(status);
        response.headers_mut().set("Location", location);
        response
    }

    fn ok(body: &str) -> Response {
        let mut response = Response::new(200);
        response.set_body(MessageBody::from_wire(body.as_bytes().to_vec()));
        response
    }

    fn client(responses: Vec<Response>, config: ClientConfig) -> HttpClient<ScriptedConnector> {
        HttpClient::with_connector(ScriptedConnector::new(responses), config)
    }

    /// WHY: the redirect loop must be bounded.
    /// WHAT: a connector that always redirects yields TooManyRedirects after
    /// exactly max_redirects + 1 attempts.
    #[test]
    fn test_redirect_loop_is_bounded() {
        let client = client(vec![redirect(302, "http://x/")], ClientConfig::default());
        match client.get("http://x/") {
            Err(HttpClientError::TooManyRedirects(attempts)) => assert_eq!(attempts, 6),
            other => panic!("expected TooManyRedirects, got {other:?}"),
        }
        assert_eq!(client.connector().seen().len(), 6);
    }

    #[test]
    fn test_zero_redirect_budget() {
        let config = ClientConfig {
            max_redirects: 0,
            ..ClientConfig::default()
        };
        let client = client(vec![redirect(301, "/elsewhere")], config);
        assert!(matches!(
            client.get("http://x/"),
            Err(HttpClientError::TooManyRedirects(1))
        ));
    }

    #[traced_test]
    #[test]
    fn test_redirect_followed_to_final_response() {
        let client = client(
            vec![redirect(301, "/moved"), ok("done")],
            ClientConfig::default(),
        );
        let response = client.get("http://example.org/start").unwrap();
        assert_eq!(response.body().as_bytes(), b"done");

        let seen = client.connector().seen();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[1].url().to_string(), "http://example.org/moved");
        assert!(logs_contain("following 301 redirect"));
    }

    #[test]
    fn test_redirects_not_followed_when_disabled() {
        let config = ClientConfig {
            follow_redirects: false,
            ..ClientConfig::default()
        };
        let client = client(vec![redirect(302, "/other")], config);
        assert_eq!(client.get("http://example.org/").unwrap().status(), 302);
    }

    #[test]
    fn test_missing_location_fails() {
        let client = client(vec![Response::new(302)], ClientConfig::default());
        assert!(matches!(
            client.get("http://example.org/"),
            Err(HttpClientError::MissingRedirectLocation)
        ));
    }

    #[test]
    fn test_redirect_preserves_method_and_body_by_default() {
        let client = client(vec![redirect(303, "/result"), ok("")], ClientConfig::default());
        let mut request = Request::new("http://example.org/form", Method::POST).unwrap();
        request.set_body("a=1").unwrap();
        client.send(request).unwrap();

        let seen = client.connector().seen();
        assert_eq!(seen[1].method(), &Method::POST);
        assert_eq!(seen[1].body().as_bytes(), b"a=1");
    }

    #[test]
    fn test_see_other_as_get() {
        let config = ClientConfig {
            see_other_as_get: true,
            ..ClientConfig::default()
        };
        let client = client(vec![redirect(303, "/result"), ok("")], config);
        let mut request = Request::new("http://example.org/form", Method::POST).unwrap();
        request.set_body("a=1").unwrap();
        client.send(request).unwrap();

        let seen = client.connector().seen();
        assert_eq!(seen[1].method(), &Method::GET);
        assert!(seen[1].body().is_empty());
        assert!(!seen[1].headers().contains("content-length"));
    }

    #[test]
    fn test_unsupported_protocol() {
        let client = client(vec![ok("")], ClientConfig::default());
        assert!(matches!(
            client.get("ftp://example.org/file"),
            Err(HttpClientError::UnsupportedProtocol(scheme)) if scheme == "ftp"
        ));
        assert!(client.connector().seen().is_empty());
    }

    #[test]
    fn test_redirect_to_unsupported_protocol() {
        let client = client(vec![redirect(302, "ftp://example.org/")], ClientConfig::default());
        assert!(matches!(
            client.get("http://example.org/"),
            Err(HttpClientError::UnsupportedProtocol(_))
        ));
    }

    /// WHY: the end-to-end contract of a plain GET.
    /// WHAT: the connector sees a GET for exactly the input URL, carrying
    /// User-Agent and Accept.
    #[test]
    fn test_get_sends_default_headers() {
        let client = client(vec![ok("")], ClientConfig::default());
        client.get("http://example.org/").unwrap();

        let seen = client.connector().seen();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].method(), &Method::GET);
        assert_eq!(seen[0].url().to_string(), "http://example.org/");
        assert!(seen[0].headers().contains("user-agent"));
        assert_eq!(seen[0].headers().first("accept"), Some("*/*"));
    }

    #[test]
    fn test_request_headers_win_over_defaults() {
        let mut config = ClientConfig::default();
        config.default_headers.set("X-Team", "platform");
        config.default_headers.set("Accept", "text/html");
        let client = client(vec![ok("")], config);

        let mut request = Request::get("http://example.org/").unwrap();
        request.headers_mut().set("User-Agent", "custom/1.0");
        client.send(request).unwrap();

        let seen = &client.connector().seen()[0];
        assert_eq!(seen.headers().get("user-agent").unwrap(), ["custom/1.0"]);
        assert_eq!(seen.headers().get("accept").unwrap(), ["*/*"]);
        assert_eq!(seen.headers().first("x-team"), Some("platform"));
    }

    #[test]
    fn test_method_override() {
        let config = ClientConfig {
            method_override_header: Some("X-HTTP-Method-Override".into()),
            ..ClientConfig::default()
        };
        let client = client(vec![ok("")], config);
        client.delete("http://example.org/item/1").unwrap();

        let seen = &client.connector().seen()[0];
        assert_eq!(seen.method(), &Method::POST);
        assert_eq!(seen.headers().first("x-http-method-override"), Some("DELETE"));
    }

    #[test]
    fn test_verb_helpers_force_method() {
        let client = client(vec![ok("")], ClientConfig::default());
        let mut posted = Request::new("http://example.org/", Method::POST).unwrap();
        posted.set_body("payload").unwrap();

        client.head("http://example.org/").unwrap();
        client.put(Url::parse("http://example.org/").unwrap()).unwrap();
        client.get(posted).unwrap();

        let seen = client.connector().seen();
        assert_eq!(seen[0].method(), &Method::HEAD);
        assert_eq!(seen[1].method(), &Method::PUT);
        assert_eq!(seen[2].method(), &Method::GET);
        assert!(seen[2].body().is_empty());
    }

    #[test]
    fn test_malformed_url() {
        let client = client(vec![ok("")], ClientConfig::default());
        assert!(matches!(
            client.get("http://[::1/"),
            Err(HttpClientError::MalformedUrl { .. })
        ));
    }

    #[test]
    fn test_from_config_with_proxy_builds() {
        let config = ClientConfig::from_toml_str(
            "[connector.proxy]\nhost = \"proxy.internal\"\nport = 3128\n",
        )
        .unwrap();
        let client = HttpClient::from_config(config);
        assert_eq!(
            client.config().connector.proxy.as_ref().map(|proxy| proxy.port),
            Some(3128)
        );
    }
}
