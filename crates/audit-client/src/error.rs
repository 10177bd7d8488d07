//! Error type returned by the request pipeline and the wrapped verbs

use audit_limiter::RateLimitError;

use crate::transport::TransportError;

/// Any failure a caller of the client can observe.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The request reached the transport and failed there (status, network, timeout)
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Refused by a client-side limiter before any network call
    #[error(transparent)]
    RateLimited(#[from] RateLimitError),

    /// A refresh this request was waiting on failed
    #[error("session could not be refreshed: {0}")]
    Refresh(#[from] audit_auth::Error),

    /// Request body could not be encoded or response body decoded
    #[error("invalid payload: {0}")]
    Payload(String),

    /// Input rejected before it was sent
    #[error("{message}")]
    Invalid { field: String, message: String },

    /// Raised by calling code
    #[error("{0}")]
    Application(String),
}

/// Result alias for client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Access to the HTTP status an error carries, if any.
pub trait HttpStatus {
    fn http_status(&self) -> Option<u16>;
}

impl HttpStatus for TransportError {
    fn http_status(&self) -> Option<u16> {
        self.response().map(|r| r.status)
    }
}

impl HttpStatus for Error {
    fn http_status(&self) -> Option<u16> {
        match self {
            Error::Transport(e) => e.http_status(),
            // A failed refresh ends the session; retrying cannot help
            Error::Refresh(_) => Some(401),
            Error::RateLimited(_)
            | Error::Invalid { .. }
            | Error::Payload(_)
            | Error::Application(_) => None,
        }
    }
}
