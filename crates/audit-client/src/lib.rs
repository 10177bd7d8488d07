//! HTTP client core for the audit assistant backend
//!
//! One configured request pipeline shared by every domain API module:
//!
//! - outbound: the current bearer token from the `Session` is attached to each
//!   transmission (never waits for a token)
//! - inbound 401: one refresh in flight at a time, every request that hit the
//!   401 waits on it and is replayed once with the new token
//! - inbound 429: wait for the server's `retry-after` hint and replay once
//!
//! Around the pipeline, `retry::with_retry` retries transient failures with
//! linear backoff, and `normalize` turns any failure into the stable
//! `NormalizedError` shape shown to users. The client-side `RateLimiter` from
//! `audit-limiter` sits in front of all of it for the operations that use one.

pub mod api;
pub mod client;
pub mod error;
pub mod metrics;
pub mod normalize;
pub mod refresh;
pub mod retry;
pub mod transport;

pub use api::ApiClient;
pub use client::{ClientConfig, HttpClient};
pub use error::{Error, HttpStatus, Result};
pub use normalize::{ErrorCode, NormalizedError, normalize, normalize_dyn, normalize_panic};
pub use refresh::{RefreshCoordinator, RefreshOutcome, RefreshRole};
pub use retry::{RetryPolicy, with_retry};
pub use transport::{ApiRequest, ApiResponse, TransportError};
