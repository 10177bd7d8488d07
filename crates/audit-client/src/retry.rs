//! Bounded retry with linear backoff
//!
//! Attempt `n` (starting at 1) that fails with a transient error waits
//! `base_delay * n` before the next attempt. Failures carrying 401, 403 or 404
//! are returned at once, as is the error of the final attempt.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::HttpStatus;
use crate::metrics;

/// Statuses no amount of retrying will change
const NON_RETRYABLE: [u16; 3] = [401, 403, 404];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
        }
    }

    /// Wait after failed attempt number `attempt`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }
}

/// Run `operation` until it succeeds, fails terminally, or runs out of
/// attempts. `max_attempts` below 1 is treated as 1.
pub async fn with_retry<T, E, F, Fut>(policy: RetryPolicy, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: HttpStatus + Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };

        let status = err.http_status();
        if status.is_some_and(|s| NON_RETRYABLE.contains(&s)) {
            debug!(attempt, ?status, "not retrying terminal failure");
            return Err(err);
        }
        if attempt >= max_attempts {
            debug!(attempt, "retry budget exhausted");
            return Err(err);
        }

        let delay = policy.delay_for(attempt);
        warn!(
            attempt,
            max_attempts,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "attempt failed, retrying"
        );
        metrics::record_retry();
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    #[derive(Debug, PartialEq)]
    struct Failure {
        status: Option<u16>,
        attempt: u32,
    }

    impl Display for Failure {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "failure {:?} on attempt {}", self.status, self.attempt)
        }
    }

    impl HttpStatus for Failure {
        fn http_status(&self) -> Option<u16> {
            self.status
        }
    }

    fn policy() -> RetryPolicy {
        RetryPolicy::new(3, Duration::from_millis(1000))
    }

    #[test]
    fn delay_grows_linearly() {
        let policy = policy();
        assert_eq!(policy.delay_for(1), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(2), Duration::from_millis(2000));
        assert_eq!(RetryPolicy::default(), policy);
    }

    #[tokio::test(start_paused = true)]
    async fn not_found_is_not_retried() {
        let attempts = Arc::new(AtomicU32::new(0));
        let started = Instant::now();

        let result: Result<(), Failure> = with_retry(policy(), || {
            let n = attempts.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                Err(Failure {
                    status: Some(404),
                    attempt: n,
                })
            }
        })
        .await;

        assert_eq!(result.unwrap_err().attempt, 1);
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn auth_failures_are_not_retried() {
        for status in [401, 403] {
            let attempts = AtomicU32::new(0);
            let result: Result<(), Failure> = with_retry(policy(), || {
                let n = attempts.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    Err(Failure {
                        status: Some(status),
                        attempt: n,
                    })
                }
            })
            .await;
            assert!(result.is_err());
            assert_eq!(attempts.load(Ordering::SeqCst), 1, "status {status}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failures_back_off_linearly_then_succeed() {
        let attempts = AtomicU32::new(0);
        let started = Instant::now();

        let result: Result<&str, Failure> = with_retry(policy(), || {
            let n = attempts.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if n < 3 {
                    Err(Failure {
                        status: Some(503),
                        attempt: n,
                    })
                } else {
                    Ok("done")
                }
            }
        })
        .await;

        assert_eq!(result, Ok("done"));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        // 1000ms after attempt 1, 2000ms after attempt 2
        assert!(started.elapsed() >= Duration::from_millis(3000));
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_budget_returns_last_error() {
        let attempts = AtomicU32::new(0);

        let result: Result<(), Failure> = with_retry(policy(), || {
            let n = attempts.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                Err(Failure {
                    status: None,
                    attempt: n,
                })
            }
        })
        .await;

        assert_eq!(
            result,
            Err(Failure {
                status: None,
                attempt: 3,
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn zero_attempts_still_runs_once() {
        let attempts = AtomicU32::new(0);
        let result: Result<(), Failure> =
            with_retry(RetryPolicy::new(0, Duration::from_secs(1)), || {
                let n = attempts.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    Err(Failure {
                        status: Some(500),
                        attempt: n,
                    })
                }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn backoff_does_not_block_other_tasks() {
        let ticks = Arc::new(AtomicU32::new(0));
        let ticker = {
            let ticks = ticks.clone();
            tokio::spawn(async move {
                for _ in 0..10 {
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    ticks.fetch_add(1, Ordering::SeqCst);
                }
            })
        };

        let _: Result<(), Failure> = with_retry(RetryPolicy::new(2, Duration::from_secs(1)), || async {
            Err(Failure {
                status: Some(500),
                attempt: 0,
            })
        })
        .await;

        // The ticker kept running through the 1s backoff
        assert!(ticks.load(Ordering::SeqCst) >= 9);
        ticker.await.unwrap();
    }
}
