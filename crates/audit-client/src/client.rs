//! The request pipeline
//!
//! `HttpClient::send` drives one logical request through its transmissions:
//!
//! 1. attach the session's current bearer token (or the token a refresh just
//!    produced for this request) and send
//! 2. 401, first time for this request: join or start the single-flight
//!    refresh, then replay with the new token
//! 3. 429, first time for this request: sleep for the server's `retry-after`
//!    (seconds, default 1) and replay
//! 4. anything else is returned unchanged
//!
//! Each marker is per logical request, so a request is replayed at most once
//! for auth and at most once for rate limiting.

use std::sync::Arc;
use std::time::{Duration, Instant};

use audit_auth::{DEFAULT_BASE_URL, Session};
use common::Secret;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use tracing::{Instrument, debug, info_span, warn};

use crate::error::{Error, Result};
use crate::metrics;
use crate::refresh::{RefreshCoordinator, RefreshRole};
use crate::transport::{ApiRequest, ApiResponse, Transport, TransportError};

/// Wait applied to a 429 without a usable `retry-after` header
pub const DEFAULT_RATE_LIMIT_WAIT: Duration = Duration::from_secs(1);

/// Connection settings for the pipeline.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    /// Applied to every transmission and to the refresh call
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}

/// Per-request state carried across replays.
struct InFlight {
    request: ApiRequest,
    request_id: String,
    retried_for_auth: bool,
    retried_for_rate_limit: bool,
    /// Token handed back by a refresh; wins over the session's current token
    token_override: Option<Secret<String>>,
}

impl InFlight {
    fn new(request: ApiRequest) -> Self {
        Self {
            request,
            request_id: format!("req_{}", uuid::Uuid::new_v4().simple()),
            retried_for_auth: false,
            retried_for_rate_limit: false,
            token_override: None,
        }
    }
}

/// Configured pipeline shared by every caller.
pub struct HttpClient {
    transport: Transport,
    session: Arc<Session>,
    refresher: RefreshCoordinator,
}

impl HttpClient {
    pub fn new(config: ClientConfig, session: Arc<Session>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| Error::Transport(TransportError::from(e)))?;
        Ok(Self::with_http_client(http, config, session))
    }

    /// Build on an existing reqwest client (shared connection pool).
    pub fn with_http_client(
        http: reqwest::Client,
        config: ClientConfig,
        session: Arc<Session>,
    ) -> Self {
        let refresher = RefreshCoordinator::new(
            session.clone(),
            http.clone(),
            config.base_url.clone(),
            config.timeout,
        );
        Self {
            transport: Transport::new(http, config.base_url, config.timeout),
            session,
            refresher,
        }
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Send one logical request through the interceptor chain.
    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        let mut flight = InFlight::new(request);
        let span = info_span!(
            "request",
            request_id = %flight.request_id,
            method = %flight.request.method,
            path = %flight.request.path,
        );
        self.drive(&mut flight).instrument(span).await
    }

    async fn drive(&self, flight: &mut InFlight) -> Result<ApiResponse> {
        loop {
            let bearer = match &flight.token_override {
                Some(token) => Some(token.clone()),
                None => self.session.token().await,
            };

            let started = Instant::now();
            let outcome = self
                .transport
                .send(&flight.request, bearer.as_ref(), &flight.request_id)
                .await;
            let status = match &outcome {
                Ok(response) => response.status.to_string(),
                Err(e) => e
                    .response()
                    .map(|r| r.status.to_string())
                    .unwrap_or_else(|| String::from("error")),
            };
            metrics::record_request(
                &status,
                flight.request.method.as_str(),
                started.elapsed().as_secs_f64(),
            );

            let err = match outcome {
                Ok(response) => {
                    debug!(status = response.status, "request completed");
                    return Ok(response);
                }
                Err(e) => e,
            };

            match err.response().map(|r| r.status) {
                Some(401) if !flight.retried_for_auth => {
                    flight.retried_for_auth = true;
                    debug!("unauthorized, waiting on token refresh");
                    let outcome = self.refresher.refresh().await;
                    let role = outcome.role;
                    match outcome.result {
                        Ok(token) => {
                            flight.token_override = Some(token);
                        }
                        // The request that started the refresh reports its own 401
                        Err(_) if role == RefreshRole::Initiated => {
                            return Err(Error::Transport(err));
                        }
                        Err(refresh_err) => return Err(Error::Refresh(refresh_err)),
                    }
                }
                Some(429) if !flight.retried_for_rate_limit => {
                    flight.retried_for_rate_limit = true;
                    let wait = err
                        .response()
                        .map(|r| retry_after(&r.headers))
                        .unwrap_or(DEFAULT_RATE_LIMIT_WAIT);
                    warn!(
                        wait_ms = wait.as_millis() as u64,
                        "rate limited by server, replaying after wait"
                    );
                    metrics::record_rate_limit_wait();
                    tokio::time::sleep(wait).await;
                }
                status => {
                    debug!(?status, error = %err, "request failed");
                    return Err(Error::Transport(err));
                }
            }
        }
    }
}

/// Server backoff hint in seconds; fractional values are honored.
fn retry_after(headers: &HeaderMap) -> Duration {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<f64>().ok())
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
        .unwrap_or(DEFAULT_RATE_LIMIT_WAIT)
}
