use derive_more::From;

use crate::url::InvalidUrl;

pub type MessageResult<T> = std::result::Result<T, MessageError>;

/// Errors raised while building or deriving request/response messages.
#[derive(From, Debug, Clone, PartialEq, Eq)]
pub enum MessageError {
    /// The operation is not allowed for the message's current state,
    /// e.g. attaching a body to a GET request.
    #[from(ignore)]
    InvalidOperation(String),

    /// A redirect response carried no `Location` header.
    MissingRedirectLocation,

    /// The `Location` header could not be resolved against the request URL.
    InvalidLocation(InvalidUrl),

    #[from(ignore)]
    InvalidVersion(String),
}

impl std::error::Error for MessageError {}

impl core::fmt::Display for MessageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidOperation(reason) => write!(f, "invalid operation: {reason}"),
            Self::MissingRedirectLocation => {
                write!(f, "redirect response has no Location header")
            }
            Self::InvalidLocation(err) => write!(f, "invalid redirect location: {err}"),
            Self::InvalidVersion(version) => write!(f, "invalid HTTP version: {version}"),
        }
    }
}
