//! Forward-proxy support by composition over [`StreamConnector`].

use super::config::ProxyConfig;
use super::connector::{basic_auth, endpoint, Connector, Route, StreamConnector};
use super::dns::{DefaultDnsResolver, DnsResolver};
use super::errors::HttpClientResult;
use super::pool::Transport;
use crate::message::{Request, Response};
use crate::url::Url;

/// Sends requests through a forward proxy unless the destination host is
/// on the bypass list.
///
/// Plain `http` requests are written to the proxy with an absolute-form
/// request-target. `https` requests open a `CONNECT` tunnel through the
/// proxy and run TLS end to end with the origin. Credentials in the proxy
/// config become a `Proxy-Authorization` header.
#[derive(Debug)]
pub struct ProxyingConnector<R: DnsResolver = DefaultDnsResolver> {
    inner: StreamConnector<R>,
    proxy: ProxyConfig,
}

impl<R: DnsResolver> ProxyingConnector<R> {
    pub fn new(inner: StreamConnector<R>, proxy: ProxyConfig) -> Self {
        Self { inner, proxy }
    }

    #[must_use]
    pub fn proxy(&self) -> &ProxyConfig {
        &self.proxy
    }

    #[must_use]
    pub fn inner(&self) -> &StreamConnector<R> {
        &self.inner
    }

    /// The route for `url`: direct when bypassed, through the proxy otherwise.
    pub(crate) fn route(&self, url: &Url) -> HttpClientResult<Route> {
        let (transport, host, port) = endpoint(url)?;
        if self.proxy.bypasses(&host) {
            tracing::debug!("bypassing proxy for {host}");
            return Route::direct(url);
        }

        let proxy_authorization = self.proxy.username.as_deref().map(|user| {
            basic_auth(user, self.proxy.password.as_deref().unwrap_or(""))
        });

        let route = match transport {
            Transport::Tcp => Route {
                transport,
                connect_host: self.proxy.host.clone(),
                connect_port: self.proxy.port,
                tls_host: host,
                tunnel: None,
                target: url.canonical(),
                proxy_authorization,
            },
            Transport::Tls => {
                let authority = match url.host() {
                    Some(bracketed) => format!("{bracketed}:{port}"),
                    None => format!("{host}:{port}"),
                };
                Route {
                    transport,
                    connect_host: self.proxy.host.clone(),
                    connect_port: self.proxy.port,
                    tls_host: host,
                    tunnel: Some(authority),
                    target: url.request_target(),
                    proxy_authorization,
                }
            }
        };
        Ok(route)
    }
}

impl<R: DnsResolver> Connector for ProxyingConnector<R> {
    fn send(&self, request: &Request) -> HttpClientResult<Response> {
        let route = self.route(request.url())?;
        self.inner.send_via(request, &route)
    }
}
