//! Wire and storage constants shared with the backend

/// Storage key holding the current access (bearer) token
pub const ACCESS_TOKEN_KEY: &str = "auth_token";

/// Storage key holding the refresh token
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";

/// Refresh endpoint, relative to the API base URL.
/// Accepts `{ "refreshToken": ... }` and returns `{ "token": ... }`.
pub const REFRESH_PATH: &str = "/auth/refresh";

/// Backend used when no base URL is configured
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
