//! Predefined budgets for the three classes of client calls
//!
//! `chat` is shared by every chat operation (list, create, send, fetch
//! messages), each under its own key, so a burst on one conversation does not
//! starve another.

use std::sync::Arc;
use std::time::Duration;

use crate::limiter::{RateLimitOptions, RateLimiter};

impl RateLimitOptions {
    /// General API calls: 100 per minute.
    pub fn api() -> Self {
        RateLimitOptions::new(100, Duration::from_secs(60))
            .with_message("Too many API requests, please try again in a moment")
    }

    /// Login and registration attempts: 5 per 5 minutes.
    pub fn auth() -> Self {
        RateLimitOptions::new(5, Duration::from_secs(5 * 60))
            .with_message("Too many login attempts, please try again in a few minutes")
    }

    /// Chat operations: 20 per 10 seconds.
    pub fn chat() -> Self {
        RateLimitOptions::new(20, Duration::from_secs(10))
            .with_message("You are sending messages too quickly, please wait")
    }
}

/// One limiter per preset, shared by the domain API modules.
#[derive(Clone)]
pub struct Presets {
    pub api: Arc<RateLimiter>,
    pub auth: Arc<RateLimiter>,
    pub chat: Arc<RateLimiter>,
}

impl Presets {
    pub fn new(api: RateLimitOptions, auth: RateLimitOptions, chat: RateLimitOptions) -> Self {
        Self {
            api: Arc::new(RateLimiter::new(api)),
            auth: Arc::new(RateLimiter::new(auth)),
            chat: Arc::new(RateLimiter::new(chat)),
        }
    }
}

impl Default for Presets {
    fn default() -> Self {
        Self::new(
            RateLimitOptions::api(),
            RateLimitOptions::auth(),
            RateLimitOptions::chat(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preset_budgets() {
        let chat = RateLimitOptions::chat();
        assert_eq!(chat.max_requests, 20);
        assert_eq!(chat.window, Duration::from_secs(10));

        let auth = RateLimitOptions::auth();
        assert_eq!(auth.max_requests, 5);
        assert_eq!(auth.window, Duration::from_secs(300));

        let api = RateLimitOptions::api();
        assert_eq!(api.max_requests, 100);
        assert_eq!(api.window, Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn preset_limiters_are_independent() {
        let presets = Presets::default();
        for _ in 0..5 {
            presets
                .auth
                .execute("auth_login", || async {
                    Ok::<_, crate::RateLimitError>(())
                })
                .await
                .unwrap();
        }

        let err = presets
            .auth
            .execute("auth_login", || async { Ok::<_, crate::RateLimitError>(()) })
            .await
            .unwrap_err();
        assert!(err.message.contains("login attempts"), "got: {}", err.message);
        assert_eq!(err.retry_after, 300);

        // The chat limiter has its own state
        assert!(presets.chat.state("auth_login").await.is_none());
    }
}
