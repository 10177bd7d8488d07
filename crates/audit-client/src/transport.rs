//! Request/response values and the single-shot transport
//!
//! `Transport::send` performs exactly one HTTP exchange: no retries, no
//! refresh, no backoff. Non-2xx responses come back as
//! `TransportError::Status` carrying the full response so the interceptor
//! chain and the normalizer can inspect status, headers and body.

use std::time::Duration;

use common::Secret;
use reqwest::Method;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

use crate::error::{Error, Result};

/// Correlation header sent with every transmission of a logical request
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// A request as issued by a caller, relative to the client's base URL.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
    pub headers: HeaderMap,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            headers: HeaderMap::new(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn with_json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

/// A received response. Bodies are decoded as JSON when possible, kept as a
/// JSON string otherwise, and `Null` when empty.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub data: Value,
}

impl ApiResponse {
    /// Deserialize the body into `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        T::deserialize(&self.data).map_err(|e| Error::Payload(format!("decoding response: {e}")))
    }
}

/// Failure of a single transmission.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    #[error("request failed with status {}", .0.status)]
    Status(ApiResponse),

    #[error("no response from server: {0}")]
    Network(String),

    #[error("request timed out: {0}")]
    Timeout(String),
}

impl TransportError {
    /// The response, when one was received.
    pub fn response(&self) -> Option<&ApiResponse> {
        match self {
            TransportError::Status(response) => Some(response),
            TransportError::Network(_) | TransportError::Timeout(_) => None,
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout(e.to_string())
        } else {
            TransportError::Network(e.to_string())
        }
    }
}

/// Configured reqwest client bound to a base URL with a fixed timeout.
pub(crate) struct Transport {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl Transport {
    pub(crate) fn new(http: reqwest::Client, base_url: String, timeout: Duration) -> Self {
        Self {
            http,
            base_url,
            timeout,
        }
    }

    pub(crate) fn url_for(&self, path: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        if path.starts_with('/') {
            format!("{base}{path}")
        } else {
            format!("{base}/{path}")
        }
    }

    /// Transmit `request` once, attaching `bearer` when present.
    pub(crate) async fn send(
        &self,
        request: &ApiRequest,
        bearer: Option<&Secret<String>>,
        request_id: &str,
    ) -> std::result::Result<ApiResponse, TransportError> {
        let mut headers = request.headers.clone();
        if let Some(token) = bearer {
            match HeaderValue::from_str(&format!("Bearer {}", token.expose())) {
                Ok(mut value) => {
                    value.set_sensitive(true);
                    headers.insert(AUTHORIZATION, value);
                }
                Err(e) => warn!(error = %e, "bearer token is not a valid header value, sending without it"),
            }
        }
        if let Ok(value) = HeaderValue::from_str(request_id) {
            headers.insert(REQUEST_ID_HEADER, value);
        }

        let mut builder = self
            .http
            .request(request.method.clone(), self.url_for(&request.path))
            .headers(headers)
            .timeout(self.timeout);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let success = (200..300).contains(&status);
        let bytes = match response.bytes().await {
            Ok(bytes) => bytes,
            // The status already arrived; keep it so the failure is classified by it
            Err(e) if !success => {
                warn!(status, error = %e, "failed to read error response body");
                return Err(TransportError::Status(ApiResponse {
                    status,
                    headers,
                    data: Value::Null,
                }));
            }
            Err(e) => return Err(e.into()),
        };

        let response = ApiResponse {
            status,
            headers,
            data: decode_body(&bytes),
        };
        if success {
            Ok(response)
        } else {
            Err(TransportError::Status(response))
        }
    }
}

fn decode_body(bytes: &[u8]) -> Value {
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
}
