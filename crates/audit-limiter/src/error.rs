//! Rejection raised by the limiter

/// A call was refused because its key's window budget is spent.
///
/// `retry_after` is the number of whole seconds until the window resets,
/// rounded up.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct RateLimitError {
    pub message: String,
    pub retry_after: u64,
}
