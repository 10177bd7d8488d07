//! Client-side admission control for named operations
//!
//! Throttles bursts of logically grouped calls ("send chat message", "fetch
//! messages of conversation X") before they reach the network. Each key gets
//! a fixed window that restarts lazily once it has elapsed; operations that
//! fail hand their slot back.
//!
//! Admission is approximate: check, increment, and the decrement on failure
//! are separate steps around an `.await`, so concurrent calls on one key can
//! be admitted or rejected slightly differently from a strict counter.

pub mod error;
pub mod limiter;
pub mod presets;

pub use error::RateLimitError;
pub use limiter::{RateLimitOptions, RateLimiter, WindowSnapshot};
pub use presets::Presets;
