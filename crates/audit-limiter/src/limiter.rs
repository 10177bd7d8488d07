//! Per-key fixed-window limiter
//!
//! Window state is created lazily on the first call for a key and lives until
//! cleared. A window restarts (count back to zero, new reset time) on the first
//! call made after its reset time has passed; there is no background sweeper.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

use crate::error::RateLimitError;

/// Budget for one limiter: `max_requests` admitted calls per key per `window`.
#[derive(Debug, Clone)]
pub struct RateLimitOptions {
    pub max_requests: u32,
    pub window: Duration,
    /// Message carried by every rejection from this limiter
    pub error_message: String,
}

impl RateLimitOptions {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            error_message: String::from("Too many requests, please try again later"),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.error_message = message.into();
        self
    }
}

#[derive(Debug)]
struct WindowState {
    request_count: u32,
    reset_at: Instant,
}

/// Remaining budget for a key, as reported by `RateLimiter::state`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSnapshot {
    pub remaining: u32,
    /// Whole seconds until the window resets, rounded up
    pub reset_after_secs: u64,
}

/// Keyed admission control.
pub struct RateLimiter {
    options: RateLimitOptions,
    windows: Mutex<HashMap<String, WindowState>>,
}

impl RateLimiter {
    pub fn new(options: RateLimitOptions) -> Self {
        Self {
            options,
            windows: Mutex::new(HashMap::new()),
        }
    }

    pub fn options(&self) -> &RateLimitOptions {
        &self.options
    }

    /// Run `operation` if `key` still has budget in its current window.
    ///
    /// A rejection never invokes the operation. An operation that returns
    /// `Err` gives its slot back and its error is returned unchanged.
    pub async fn execute<T, E, F, Fut>(&self, key: &str, operation: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<RateLimitError>,
    {
        let window = self.admit(key).await.map_err(E::from)?;

        match operation().await {
            Ok(value) => Ok(value),
            Err(e) => {
                self.release(key, window).await;
                Err(e)
            }
        }
    }

    /// Count a call against `key`. Returns the reset time of the window it was
    /// admitted into.
    async fn admit(&self, key: &str) -> Result<Instant, RateLimitError> {
        let now = Instant::now();
        let window = self.options.window;
        let mut windows = self.windows.lock().await;
        let state = windows.entry(key.to_string()).or_insert_with(|| WindowState {
            request_count: 0,
            reset_at: now + window,
        });

        if now > state.reset_at {
            state.request_count = 0;
            state.reset_at = now + window;
        }

        if state.request_count >= self.options.max_requests {
            let retry_after = ceil_secs(state.reset_at.saturating_duration_since(now));
            debug!(key, retry_after, "rate limit reached, rejecting call");
            metrics::counter!("limiter_rejections_total").increment(1);
            return Err(RateLimitError {
                message: self.options.error_message.clone(),
                retry_after,
            });
        }

        state.request_count += 1;
        Ok(state.reset_at)
    }

    /// Refund a failed call. A window that rolled over while the call was in
    /// flight is left alone: the failed call never counted against it.
    async fn release(&self, key: &str, admitted_into: Instant) {
        let mut windows = self.windows.lock().await;
        if let Some(state) = windows.get_mut(key) {
            if state.reset_at == admitted_into {
                state.request_count = state.request_count.saturating_sub(1);
            }
        }
    }

    /// Remaining budget and time to reset for `key`, or `None` if the key has
    /// never been used. An elapsed window reports the full budget.
    pub async fn state(&self, key: &str) -> Option<WindowSnapshot> {
        let now = Instant::now();
        let windows = self.windows.lock().await;
        let state = windows.get(key)?;

        if now > state.reset_at {
            return Some(WindowSnapshot {
                remaining: self.options.max_requests,
                reset_after_secs: 0,
            });
        }

        Some(WindowSnapshot {
            remaining: self.options.max_requests.saturating_sub(state.request_count),
            reset_after_secs: ceil_secs(state.reset_at - now),
        })
    }

    /// Forget the window for one key.
    pub async fn clear(&self, key: &str) {
        self.windows.lock().await.remove(key);
    }

    /// Forget every window.
    pub async fn clear_all(&self) {
        self.windows.lock().await.clear();
    }
}

fn ceil_secs(duration: Duration) -> u64 {
    duration.as_millis().div_ceil(1000) as u64
}
