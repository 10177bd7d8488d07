//! Error types for credential operations

/// Errors from token storage and the refresh endpoint.
///
/// `Clone` because one refresh outcome is handed to every request waiting on it.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    #[error("refresh request failed: {0}")]
    Network(String),

    #[error("refresh request timed out: {0}")]
    Timeout(String),

    #[error("refresh token rejected ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("invalid refresh response: {0}")]
    InvalidResponse(String),

    #[error("no refresh token stored")]
    MissingRefreshToken,

    #[error("token file parse error: {0}")]
    TokenFileParse(String),

    #[error("I/O error: {0}")]
    Io(String),
}

/// Result alias for credential operations.
pub type Result<T> = std::result::Result<T, Error>;
