//! Shared credential state
//!
//! The session is the single place the bearer token lives while the process
//! runs. Every outbound request reads it; it changes only on login, refresh
//! success, logout, and unrecoverable auth failure. Status changes are
//! published on a watch channel so the surrounding application can react to a
//! forced sign-out.

use std::sync::Arc;

use common::Secret;
use tokio::sync::{RwLock, watch};
use tracing::{info, warn};

use crate::credentials::{TokenKey, TokenStore};
use crate::error::Result;

/// Observable session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// No token; never logged in or logged out explicitly
    Anonymous,
    Authenticated,
    /// Credentials were dropped after a failed refresh
    Expired,
}

impl SessionStatus {
    pub fn label(&self) -> &'static str {
        match self {
            SessionStatus::Anonymous => "anonymous",
            SessionStatus::Authenticated => "authenticated",
            SessionStatus::Expired => "expired",
        }
    }
}

/// In-memory bearer token plus its persistent backing store.
pub struct Session {
    token: RwLock<Option<Secret<String>>>,
    store: Arc<TokenStore>,
    status: watch::Sender<SessionStatus>,
}

impl Session {
    /// A signed-out session over the given store.
    pub fn new(store: Arc<TokenStore>) -> Self {
        let (status, _) = watch::channel(SessionStatus::Anonymous);
        Self {
            token: RwLock::new(None),
            store,
            status,
        }
    }

    /// Seed the in-memory token from the stored access token.
    pub async fn restore(store: Arc<TokenStore>) -> Self {
        let token = store
            .get(TokenKey::Access)
            .await
            .map(Secret::new)
            .filter(|t| !t.is_empty());
        let initial = if token.is_some() {
            SessionStatus::Authenticated
        } else {
            SessionStatus::Anonymous
        };
        let (status, _) = watch::channel(initial);
        info!(status = initial.label(), "session restored");
        Self {
            token: RwLock::new(token),
            store,
            status,
        }
    }

    /// Current bearer token, if any. Never waits for a refresh to finish.
    pub async fn token(&self) -> Option<Secret<String>> {
        self.token.read().await.clone()
    }

    /// Persisted refresh token, if any.
    pub async fn refresh_token(&self) -> Option<Secret<String>> {
        self.store
            .get(TokenKey::Refresh)
            .await
            .map(Secret::new)
            .filter(|t| !t.is_empty())
    }

    /// Whether a bearer token is currently held.
    pub async fn is_authenticated(&self) -> bool {
        self.token.read().await.is_some()
    }

    /// Install tokens from a login or registration response.
    pub async fn set_credentials(&self, access: String, refresh: Option<String>) -> Result<()> {
        *self.token.write().await = Some(Secret::new(access.clone()));
        self.status.send_replace(SessionStatus::Authenticated);
        self.store.set(TokenKey::Access, access).await?;
        if let Some(refresh) = refresh {
            self.store.set(TokenKey::Refresh, refresh).await?;
        }
        Ok(())
    }

    /// Replace the access token after a successful refresh.
    ///
    /// Memory is updated before the write so that requests replayed by the
    /// caller see the new token even if persisting fails.
    pub async fn store_access_token(&self, access: String) -> Result<()> {
        *self.token.write().await = Some(Secret::new(access.clone()));
        self.status.send_replace(SessionStatus::Authenticated);
        self.store.set(TokenKey::Access, access).await
    }

    /// Explicit sign-out.
    pub async fn logout(&self) -> Result<()> {
        self.reset(SessionStatus::Anonymous).await
    }

    /// Forced sign-out after an unrecoverable auth failure.
    ///
    /// Storage errors are logged, not returned: the caller is already
    /// propagating the auth failure.
    pub async fn expire(&self) {
        if let Err(e) = self.reset(SessionStatus::Expired).await {
            warn!(error = %e, "failed to clear stored tokens after session expiry");
        }
    }

    async fn reset(&self, status: SessionStatus) -> Result<()> {
        *self.token.write().await = None;
        self.status.send_replace(status);
        info!(status = status.label(), "credentials reset");
        self.store.clear().await
    }

    /// Current status.
    pub fn status(&self) -> SessionStatus {
        *self.status.borrow()
    }

    /// Receive status changes.
    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.status.subscribe()
    }

    pub fn store(&self) -> &Arc<TokenStore> {
        &self.store
    }
}
