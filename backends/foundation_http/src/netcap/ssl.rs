//! Client-side TLS via rustls, trusting the webpki root set.

use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::sync::{Arc, LazyLock};

use rustls::pki_types::ServerName;

use super::errors::{TlsError, TlsResult};

pub type ClientTlsStream = rustls::StreamOwned<rustls::ClientConnection, TcpStream>;

static DEFAULT_CONFIG: LazyLock<Arc<rustls::ClientConfig>> =
    LazyLock::new(|| Arc::new(default_client_config()));

/// A client config trusting the Mozilla root set shipped in `webpki-roots`.
#[must_use]
pub fn default_client_config() -> rustls::ClientConfig {
    let roots = rustls::RootCertStore {
        roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
    };
    rustls::ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth()
}

/// Wraps TCP streams in rustls client sessions.
#[derive(Clone)]
pub struct RustlsConnector(Arc<rustls::ClientConfig>);

impl Default for RustlsConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl RustlsConnector {
    #[must_use]
    pub fn new() -> Self {
        Self(DEFAULT_CONFIG.clone())
    }

    #[must_use]
    pub fn with_config(config: Arc<rustls::ClientConfig>) -> Self {
        Self(config)
    }

    /// Starts a TLS session for `sni` over `plain` and drives the handshake
    /// to completion so certificate failures surface here rather than on
    /// the first read.
    ///
    /// # Errors
    ///
    /// Returns `TlsError::InvalidServerName` if `sni` is not a valid DNS
    /// name or IP address, and `TlsError::Handshake` if the handshake fails.
    pub fn from_tcp_stream(&self, sni: &str, plain: TcpStream) -> TlsResult<ClientTlsStream> {
        let server_name = ServerName::try_from(sni.to_string())
            .map_err(|err| TlsError::InvalidServerName(format!("{sni}: {err}")))?;

        let connection = rustls::ClientConnection::new(self.0.clone(), server_name)
            .map_err(|err| TlsError::ConnectorCreation(Box::new(err)))?;

        let mut stream = rustls::StreamOwned::new(connection, plain);
        while stream.conn.is_handshaking() {
            stream
                .conn
                .complete_io(&mut stream.sock)
                .map_err(|err| TlsError::Handshake(err.to_string()))?;
        }

        tracing::debug!("TLS session established with {sni}");
        Ok(stream)
    }
}

/// Reads from a TLS stream, treating a peer that closes without
/// `close_notify` as a clean EOF. Many servers do this on
/// close-delimited responses.
pub(crate) fn read_tls(stream: &mut ClientTlsStream, buf: &mut [u8]) -> io::Result<usize> {
    match stream.read(buf) {
        Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => {
            tracing::debug!("TLS peer closed without close_notify");
            Ok(0)
        }
        other => other,
    }
}

/// Processes whatever records arrived on an idle session without blocking.
/// Stale means the peer closed, sent application data nobody asked for, or
/// sent something that is not valid TLS.
pub(crate) fn is_stale(stream: &mut ClientTlsStream) -> bool {
    if stream.sock.set_nonblocking(true).is_err() {
        return true;
    }
    let stale = drain_idle_records(stream);
    if stream.sock.set_nonblocking(false).is_err() {
        return true;
    }
    stale
}

fn drain_idle_records(stream: &mut ClientTlsStream) -> bool {
    loop {
        match stream.conn.read_tls(&mut stream.sock) {
            Ok(0) => return true,
            Ok(_) => match stream.conn.process_new_packets() {
                Ok(state) => {
                    if state.peer_has_closed() || state.plaintext_bytes_to_read() > 0 {
                        return true;
                    }
                }
                Err(err) => {
                    tracing::debug!("idle TLS session failed: {err}");
                    return true;
                }
            },
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => return false,
            Err(_) => return true,
        }
    }
}

pub(crate) fn write_tls(stream: &mut ClientTlsStream, buf: &[u8]) -> io::Result<usize> {
    stream.write(buf)
}
