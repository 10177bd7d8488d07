//! Single-flight access token refresh
//!
//! At most one refresh runs at a time. The first caller to see a 401 starts it
//! and every caller arriving while it is in flight awaits the same shared
//! future instead of starting another. The slot goes back to idle when the
//! refresh finishes, so a later 401 starts a fresh one.

use std::sync::Arc;
use std::time::Duration;

use audit_auth::{Session, refresh_access_token};
use common::Secret;
use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::metrics;

type RefreshResult = std::result::Result<Secret<String>, audit_auth::Error>;
type RefreshFuture = Shared<BoxFuture<'static, RefreshResult>>;

/// How a caller took part in a refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshRole {
    /// This caller started the refresh
    Initiated,
    /// A refresh was already running; this caller waited on it
    Joined,
}

/// What a caller of `RefreshCoordinator::refresh` gets back.
#[derive(Debug, Clone)]
pub struct RefreshOutcome {
    pub role: RefreshRole,
    pub result: RefreshResult,
}

pub struct RefreshCoordinator {
    in_flight: Arc<Mutex<Option<RefreshFuture>>>,
    session: Arc<Session>,
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl RefreshCoordinator {
    pub fn new(
        session: Arc<Session>,
        http: reqwest::Client,
        base_url: String,
        timeout: Duration,
    ) -> Self {
        Self {
            in_flight: Arc::new(Mutex::new(None)),
            session,
            http,
            base_url,
            timeout,
        }
    }

    /// Refresh the access token, or wait for the refresh already running.
    ///
    /// On success the session already holds the new token when this returns.
    /// On failure the session has been expired (both stored tokens cleared).
    pub async fn refresh(&self) -> RefreshOutcome {
        let (role, pending) = {
            let mut slot = self.in_flight.lock().await;
            match slot.as_ref() {
                Some(pending) => (RefreshRole::Joined, pending.clone()),
                None => {
                    let pending = self.start();
                    *slot = Some(pending.clone());
                    (RefreshRole::Initiated, pending)
                }
            }
        };

        RefreshOutcome {
            role,
            result: pending.await,
        }
    }

    #[cfg(test)]
    async fn is_refreshing(&self) -> bool {
        self.in_flight.lock().await.is_some()
    }

    fn start(&self) -> RefreshFuture {
        let slot = self.in_flight.clone();
        let session = self.session.clone();
        let http = self.http.clone();
        let base_url = self.base_url.clone();
        let timeout = self.timeout;

        async move {
            let result = run_refresh(&session, &http, &base_url, timeout).await;
            slot.lock().await.take();
            result
        }
        .boxed()
        .shared()
    }
}

async fn run_refresh(
    session: &Session,
    http: &reqwest::Client,
    base_url: &str,
    timeout: Duration,
) -> RefreshResult {
    let Some(refresh) = session.refresh_token().await else {
        warn!("no refresh token stored, ending session");
        session.expire().await;
        metrics::record_refresh("missing");
        return Err(audit_auth::Error::MissingRefreshToken);
    };

    info!("refreshing access token");
    match refresh_access_token(http, base_url, refresh.expose(), timeout).await {
        Ok(response) => {
            if let Err(e) = session.store_access_token(response.token.clone()).await {
                warn!(error = %e, "refreshed token could not be persisted");
            }
            metrics::record_refresh("success");
            info!("access token refreshed");
            Ok(Secret::new(response.token))
        }
        Err(e) => {
            warn!(error = %e, "token refresh failed, ending session");
            session.expire().await;
            metrics::record_refresh("failure");
            Err(e)
        }
    }
}
