//! Failure classification for display
//!
//! `normalize` turns any failure the client can produce into a
//! `NormalizedError`: a stable code, a message fit to show a user, and the
//! HTTP status when there was one. It never fails and never recovers anything.
//!
//! Dispatch, first match wins:
//!
//! | failure | code |
//! | --- | --- |
//! | response 429 | `RATE_LIMIT_EXCEEDED` |
//! | response 401 | `UNAUTHORIZED` |
//! | response 400 with `error.field` | `VALIDATION_ERROR` |
//! | client-side input check | `VALIDATION_ERROR` |
//! | response 409 | `CONFLICT` |
//! | response >= 500 | `SERVER_ERROR` |
//! | any other response | `UNKNOWN_ERROR` |
//! | no response | `NETWORK_ERROR` |
//! | timed out | `CONNECTION_TIMEOUT` |
//! | client-side limiter | `RATE_LIMIT_EXCEEDED` |
//! | other error values | `APPLICATION_ERROR` |
//! | panic payloads | `UNKNOWN_ERROR` |

use std::any::Any;

use audit_limiter::RateLimitError;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::error::Error;
use crate::transport::{ApiResponse, TransportError};

/// User-facing messages.
pub mod messages {
    pub const RATE_LIMITED: &str = "Too many requests, please try again in a moment";
    pub const SESSION_EXPIRED: &str = "Session expired, please log in again";
    pub const INVALID_DATA: &str = "Invalid data";
    pub const CONFLICT: &str = "Resource conflict";
    pub const EMAIL_IN_USE: &str = "This email is already in use";
    pub const SERVER_ERROR: &str = "A server error occurred, please try again later";
    pub const TIMEOUT: &str = "The connection to the server failed, please check your internet connection";
    pub const NETWORK: &str = "Unable to reach the server, please check your internet connection";
    pub const GENERIC: &str = "An error occurred";
    pub const UNEXPECTED: &str = "An unexpected error occurred";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    RateLimitExceeded,
    Unauthorized,
    ValidationError,
    Conflict,
    ServerError,
    NetworkError,
    ConnectionTimeout,
    ApplicationError,
    UnknownError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            ErrorCode::Unauthorized => "UNAUTHORIZED",
            ErrorCode::ValidationError => "VALIDATION_ERROR",
            ErrorCode::Conflict => "CONFLICT",
            ErrorCode::ServerError => "SERVER_ERROR",
            ErrorCode::NetworkError => "NETWORK_ERROR",
            ErrorCode::ConnectionTimeout => "CONNECTION_TIMEOUT",
            ErrorCode::ApplicationError => "APPLICATION_ERROR",
            ErrorCode::UnknownError => "UNKNOWN_ERROR",
        }
    }
}

/// Display-ready failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[serde(rename_all = "camelCase")]
#[error("{message}")]
pub struct NormalizedError {
    pub message: String,
    pub code: ErrorCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    /// Offending input field, for validation failures
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Map<String, Value>>,
}

impl NormalizedError {
    fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code,
            status_code: None,
            field: None,
            details: None,
        }
    }

    fn with_status(mut self, status: u16) -> Self {
        self.status_code = Some(status);
        self
    }

    fn with_detail(mut self, key: &str, value: Value) -> Self {
        self.details
            .get_or_insert_with(Map::new)
            .insert(key.to_string(), value);
        self
    }
}

/// Classify a client error.
pub fn normalize(error: &Error) -> NormalizedError {
    match error {
        Error::Transport(e) => normalize_transport(e),
        Error::RateLimited(e) => normalize_rate_limit(e),
        Error::Refresh(e) => normalize_refresh(e),
        Error::Invalid { field, message } => {
            let mut normalized = NormalizedError::new(ErrorCode::ValidationError, message.clone());
            normalized.field = Some(field.clone());
            normalized
        }
        Error::Payload(message) | Error::Application(message) => {
            NormalizedError::new(ErrorCode::ApplicationError, message.clone())
        }
    }
}

/// Classify any error value, looking through its source chain for a failure
/// this crate knows about.
pub fn normalize_dyn(error: &(dyn std::error::Error + 'static)) -> NormalizedError {
    let mut current = Some(error);
    while let Some(e) = current {
        if let Some(e) = e.downcast_ref::<Error>() {
            return normalize(e);
        }
        if let Some(e) = e.downcast_ref::<TransportError>() {
            return normalize_transport(e);
        }
        if let Some(e) = e.downcast_ref::<RateLimitError>() {
            return normalize_rate_limit(e);
        }
        if let Some(e) = e.downcast_ref::<audit_auth::Error>() {
            return normalize_refresh(e);
        }
        if let Some(e) = e.downcast_ref::<reqwest::Error>() {
            return normalize_reqwest(e);
        }
        if let Some(e) = e.downcast_ref::<NormalizedError>() {
            return e.clone();
        }
        current = e.source();
    }
    NormalizedError::new(ErrorCode::ApplicationError, error.to_string())
}

/// Classify a panic payload (the one failure value that is not an error).
pub fn normalize_panic(_payload: &(dyn Any + Send)) -> NormalizedError {
    NormalizedError::new(ErrorCode::UnknownError, messages::UNEXPECTED)
}

pub fn normalize_transport(error: &TransportError) -> NormalizedError {
    match error {
        TransportError::Status(response) => from_response(response),
        TransportError::Network(_) => {
            NormalizedError::new(ErrorCode::NetworkError, messages::NETWORK)
        }
        TransportError::Timeout(_) => {
            NormalizedError::new(ErrorCode::ConnectionTimeout, messages::TIMEOUT)
        }
    }
}

fn normalize_rate_limit(error: &RateLimitError) -> NormalizedError {
    NormalizedError::new(ErrorCode::RateLimitExceeded, error.message.clone())
        .with_status(429)
        .with_detail("retryAfter", json!(error.retry_after))
        .with_detail("source", json!("client"))
}

fn normalize_refresh(error: &audit_auth::Error) -> NormalizedError {
    match error {
        audit_auth::Error::Network(_) => {
            NormalizedError::new(ErrorCode::NetworkError, messages::NETWORK)
        }
        audit_auth::Error::Timeout(_) => {
            NormalizedError::new(ErrorCode::ConnectionTimeout, messages::TIMEOUT)
        }
        _ => NormalizedError::new(ErrorCode::Unauthorized, messages::SESSION_EXPIRED)
            .with_status(401),
    }
}

fn normalize_reqwest(error: &reqwest::Error) -> NormalizedError {
    if error.is_timeout() {
        return NormalizedError::new(ErrorCode::ConnectionTimeout, messages::TIMEOUT);
    }
    match error.status() {
        Some(status) => from_status(status.as_u16(), None, &Value::Null),
        None => NormalizedError::new(ErrorCode::NetworkError, messages::NETWORK),
    }
}

fn from_response(response: &ApiResponse) -> NormalizedError {
    from_status(response.status, Some(&response.headers), &response.data)
}

fn from_status(status: u16, headers: Option<&HeaderMap>, body: &Value) -> NormalizedError {
    match status {
        429 => {
            let mut normalized =
                NormalizedError::new(ErrorCode::RateLimitExceeded, messages::RATE_LIMITED)
                    .with_status(429)
                    .with_detail("source", json!("server"));
            if let Some(secs) = headers.and_then(retry_after_secs) {
                normalized = normalized.with_detail("retryAfter", json!(secs));
            }
            normalized
        }
        401 => NormalizedError::new(ErrorCode::Unauthorized, messages::SESSION_EXPIRED)
            .with_status(401),
        400 if validation_field(body).is_some() => {
            let invalid = &body["error"];
            let message = invalid["message"]
                .as_str()
                .filter(|m| !m.is_empty())
                .unwrap_or(messages::INVALID_DATA);
            let mut normalized =
                NormalizedError::new(ErrorCode::ValidationError, message).with_status(400);
            normalized.field = validation_field(body);
            normalized
        }
        409 => {
            let message = match first_present(body, &["message", "error"]) {
                None => messages::CONFLICT.to_string(),
                Some(Value::String(s)) => s.clone(),
                Some(_) => messages::EMAIL_IN_USE.to_string(),
            };
            NormalizedError::new(ErrorCode::Conflict, message).with_status(409)
        }
        s if s >= 500 => {
            NormalizedError::new(ErrorCode::ServerError, messages::SERVER_ERROR).with_status(s)
        }
        s => {
            let message = ["message", "detail"]
                .iter()
                .find_map(|k| body[*k].as_str().filter(|m| !m.is_empty()))
                .unwrap_or(messages::GENERIC);
            NormalizedError::new(ErrorCode::UnknownError, message).with_status(s)
        }
    }
}

fn validation_field(body: &Value) -> Option<String> {
    match &body["error"]["field"] {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// First key whose value is present and truthy.
fn first_present<'a>(body: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().map(|k| &body[*k]).find(|v| match v {
        Value::Null | Value::Bool(false) => false,
        Value::String(s) => !s.is_empty(),
        _ => true,
    })
}

fn retry_after_secs(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|s| s.is_finite() && *s >= 0.0)
        .map(|s| s.ceil() as u64)
}
