use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::time::Duration;

use super::errors::TlsResult;

#[cfg(not(feature = "ssl-rustls"))]
use super::errors::TlsError;

#[cfg(feature = "ssl-rustls")]
use super::ssl::{self, ClientTlsStream, RustlsConnector};

/// Connect, read and write timeouts for a transport stream. `None` means
/// block indefinitely.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Timeouts {
    pub connect: Option<Duration>,
    pub read: Option<Duration>,
    pub write: Option<Duration>,
}

/// A client transport: plain TCP or TLS over TCP.
pub enum RawStream {
    Plain(TcpStream),
    #[cfg(feature = "ssl-rustls")]
    Tls(Box<ClientTlsStream>),
}

impl std::fmt::Debug for RawStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Plain(stream) => f
                .debug_tuple("RawStream::Plain")
                .field(&stream.peer_addr().ok())
                .finish(),
            #[cfg(feature = "ssl-rustls")]
            Self::Tls(stream) => f
                .debug_tuple("RawStream::Tls")
                .field(&stream.sock.peer_addr().ok())
                .finish(),
        }
    }
}

impl RawStream {
    /// Connects to the first reachable address in `addrs`, applying the
    /// connect timeout per attempt and the read/write timeouts to the
    /// resulting socket.
    ///
    /// # Errors
    ///
    /// Returns the last connect error, or `InvalidInput` when `addrs` is
    /// empty.
    pub fn connect(addrs: &[SocketAddr], timeouts: Timeouts) -> io::Result<Self> {
        let mut last_error = None;

        for addr in addrs {
            let attempt = match timeouts.connect {
                Some(timeout) => TcpStream::connect_timeout(addr, timeout),
                None => TcpStream::connect(addr),
            };

            match attempt {
                Ok(stream) => {
                    stream.set_read_timeout(timeouts.read)?;
                    stream.set_write_timeout(timeouts.write)?;
                    stream.set_nodelay(true)?;
                    return Ok(Self::Plain(stream));
                }
                Err(err) => {
                    tracing::debug!("connect to {addr} failed: {err}");
                    last_error = Some(err);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "no addresses to connect to")
        }))
    }

    /// Upgrades a plain stream to TLS for `host`. Already-upgraded streams
    /// are returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns `TlsError::NotCompiled` when no TLS backend is enabled, or the
    /// handshake error.
    #[cfg(feature = "ssl-rustls")]
    pub fn upgrade_to_tls(self, host: &str) -> TlsResult<Self> {
        match self {
            Self::Plain(stream) => {
                let tls = RustlsConnector::new().from_tcp_stream(host, stream)?;
                Ok(Self::Tls(Box::new(tls)))
            }
            tls @ Self::Tls(_) => Ok(tls),
        }
    }

    /// Upgrades a plain stream to TLS for `host`.
    ///
    /// # Errors
    ///
    /// Always `TlsError::NotCompiled`: this build has no TLS backend.
    #[cfg(not(feature = "ssl-rustls"))]
    pub fn upgrade_to_tls(self, host: &str) -> TlsResult<Self> {
        tracing::debug!("cannot upgrade connection to {host}: no TLS backend");
        Err(TlsError::NotCompiled)
    }

    #[must_use]
    pub fn is_tls(&self) -> bool {
        !matches!(self, Self::Plain(_))
    }

    fn socket(&self) -> &TcpStream {
        match self {
            Self::Plain(stream) => stream,
            #[cfg(feature = "ssl-rustls")]
            Self::Tls(stream) => &stream.sock,
        }
    }

    /// # Errors
    ///
    /// Returns the socket error.
    pub fn peer_addr(&self) -> io::Result<SocketAddr> {
        self.socket().peer_addr()
    }

    /// # Errors
    ///
    /// Returns the socket error.
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        self.socket().set_read_timeout(timeout)
    }

    /// # Errors
    ///
    /// Returns the socket error.
    pub fn set_write_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        self.socket().set_write_timeout(timeout)
    }

    /// True when the peer has closed its side or unexpected bytes are
    /// waiting. Used to discard pooled connections that went stale while
    /// idle.
    ///
    /// TLS streams are checked at the record layer: records the server sends
    /// on an idle session (TLS 1.3 session tickets) are processed and do not
    /// count as unexpected data.
    #[must_use]
    pub fn is_stale(&mut self) -> bool {
        match self {
            Self::Plain(stream) => plain_is_stale(stream),
            #[cfg(feature = "ssl-rustls")]
            Self::Tls(stream) => ssl::is_stale(stream),
        }
    }

    /// Closes both directions, ignoring errors from an already-closed socket.
    pub fn shutdown(&self) {
        if let Err(err) = self.socket().shutdown(Shutdown::Both) {
            tracing::trace!("shutdown of closed socket: {err}");
        }
    }
}

fn plain_is_stale(socket: &TcpStream) -> bool {
    if socket.set_nonblocking(true).is_err() {
        return true;
    }
    let mut probe = [0u8; 1];
    let stale = match socket.peek(&mut probe) {
        Ok(_) => true,
        Err(err) => err.kind() != io::ErrorKind::WouldBlock,
    };
    if socket.set_nonblocking(false).is_err() {
        return true;
    }
    stale
}

impl Read for RawStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Plain(stream) => stream.read(buf),
            #[cfg(feature = "ssl-rustls")]
            Self::Tls(stream) => ssl::read_tls(stream, buf),
        }
    }
}

impl Write for RawStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Plain(stream) => stream.write(buf),
            #[cfg(feature = "ssl-rustls")]
            Self::Tls(stream) => ssl::write_tls(stream, buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Plain(stream) => stream.flush(),
            #[cfg(feature = "ssl-rustls")]
            Self::Tls(stream) => stream.flush(),
        }
    }
}
