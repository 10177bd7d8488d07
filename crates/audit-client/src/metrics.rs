//! Client-side metrics
//!
//! Emitted through the `metrics` facade; no exporter is installed here. The
//! embedding application decides whether and how to expose them.
//!
//! - `client_requests_total` (counter): labels `status`, `method`
//! - `client_request_duration_seconds` (histogram): label `status`
//! - `client_retries_total` (counter)
//! - `client_token_refresh_total` (counter): label `outcome`
//! - `client_rate_limit_waits_total` (counter)

/// Record one transmission. `status` is the HTTP status, or `"error"` when no
/// response arrived.
pub fn record_request(status: &str, method: &str, duration_secs: f64) {
    metrics::counter!("client_requests_total", "status" => status.to_string(), "method" => method.to_string())
        .increment(1);
    metrics::histogram!("client_request_duration_seconds", "status" => status.to_string())
        .record(duration_secs);
}

/// Record a backoff-and-retry decision.
pub fn record_retry() {
    metrics::counter!("client_retries_total").increment(1);
}

/// Record a finished refresh (`success`, `failure`, `missing`).
pub fn record_refresh(outcome: &'static str) {
    metrics::counter!("client_token_refresh_total", "outcome" => outcome).increment(1);
}

/// Record a wait on a server 429 before replaying.
pub fn record_rate_limit_wait() {
    metrics::counter!("client_rate_limit_waits_total").increment(1);
}
