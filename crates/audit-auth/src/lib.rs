//! Credential handling for the audit API client
//!
//! Owns everything the request pipeline needs to know about authentication:
//! the two persisted token keys, the in-memory bearer token shared by all
//! requests, and the refresh endpoint call. The crate performs no request
//! retries of its own; coordination of concurrent refreshes lives in
//! `audit-client`.
//!
//! Credential flow:
//! 1. Login/register stores both tokens via `Session::set_credentials()`
//! 2. Every outbound request reads `Session::token()`
//! 3. A 401 triggers `token::refresh_access_token()` with the stored refresh token
//! 4. Success is saved via `Session::store_access_token()`
//! 5. Failure or logout clears both keys via `Session::expire()` / `Session::logout()`

pub mod constants;
pub mod credentials;
pub mod error;
pub mod session;
pub mod token;

pub use constants::*;
pub use credentials::{TokenKey, TokenStore};
pub use error::{Error, Result};
pub use session::{Session, SessionStatus};
pub use token::{RefreshResponse, refresh_access_token};
