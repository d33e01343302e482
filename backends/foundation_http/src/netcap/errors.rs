use derive_more::From;

use std::{error, io};

pub type BoxedError = Box<dyn error::Error + Send + Sync + 'static>;

pub type TlsResult<T> = std::result::Result<T, TlsError>;

#[derive(From, Debug)]
pub enum TlsError {
    /// The crate was built without a TLS backend.
    NotCompiled,

    #[from(ignore)]
    InvalidServerName(String),

    #[from(ignore)]
    Handshake(String),

    #[from(ignore)]
    ConnectorCreation(BoxedError),

    IO(io::Error),
}

impl std::error::Error for TlsError {}

impl core::fmt::Display for TlsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotCompiled => write!(f, "TLS support not compiled in"),
            Self::InvalidServerName(name) => write!(f, "invalid TLS server name: {name}"),
            Self::Handshake(reason) => write!(f, "TLS handshake failed: {reason}"),
            Self::ConnectorCreation(err) => write!(f, "failed to create TLS connector: {err}"),
            Self::IO(err) => write!(f, "TLS I/O error: {err}"),
        }
    }
}
