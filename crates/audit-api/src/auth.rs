//! Login, registration and the caller's own profile

use std::sync::Arc;

use audit_auth::Session;
use audit_client::{ApiClient, Error, Result};
use audit_limiter::RateLimiter;
use tracing::info;

use crate::model::{
    AuthResponse, LoginCredentials, ProfileEnvelope, ProfileUpdate, RegisterData, UserProfile,
};

pub const LOGIN_KEY: &str = "auth_login";
pub const REGISTER_KEY: &str = "auth_register";

#[derive(Clone)]
pub struct AuthApi {
    api: ApiClient,
    limiter: Arc<RateLimiter>,
}

impl AuthApi {
    pub fn new(api: ApiClient, limiter: Arc<RateLimiter>) -> Self {
        Self { api, limiter }
    }

    fn session(&self) -> &Arc<Session> {
        self.api.core().session()
    }

    /// Log in and keep both returned tokens.
    pub async fn login(&self, credentials: &LoginCredentials) -> Result<AuthResponse> {
        self.limiter
            .execute(LOGIN_KEY, || async {
                let auth: AuthResponse = self.api.post("/auth/login", credentials).await?.json()?;
                self.keep_tokens(&auth).await?;
                info!("logged in");
                Ok::<_, Error>(auth)
            })
            .await
    }

    /// Create an account and keep both returned tokens.
    pub async fn register(&self, data: &RegisterData) -> Result<AuthResponse> {
        self.limiter
            .execute(REGISTER_KEY, || async {
                let auth: AuthResponse =
                    self.api.post("/auth/register", data).await?.json()?;
                self.keep_tokens(&auth).await?;
                info!("registered");
                Ok::<_, Error>(auth)
            })
            .await
    }

    async fn keep_tokens(&self, auth: &AuthResponse) -> Result<()> {
        if auth.token.is_empty() {
            return Ok(());
        }
        let refresh = Some(auth.refresh_token.clone()).filter(|t| !t.is_empty());
        self.session()
            .set_credentials(auth.token.clone(), refresh)
            .await
            .map_err(|e| Error::Application(format!("storing credentials: {e}")))
    }

    pub async fn profile(&self) -> Result<UserProfile> {
        let envelope: ProfileEnvelope = self.api.get("/user/profile").await?.json()?;
        Ok(envelope.user)
    }

    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<UserProfile> {
        let envelope: ProfileEnvelope = self.api.patch("/user/profile", update).await?.json()?;
        Ok(envelope.user)
    }

    /// Drop both tokens. Purely local: the backend keeps no session.
    pub async fn logout(&self) -> Result<()> {
        self.session()
            .logout()
            .await
            .map_err(|e| Error::Application(format!("clearing credentials: {e}")))
    }

    pub async fn is_authenticated(&self) -> bool {
        self.session().is_authenticated().await
    }
}
