//! Domain API modules for the audit assistant backend
//!
//! Thin wrappers over `audit_client::ApiClient`: each builds a request, runs
//! it through the retried pipeline (and a client-side limiter where the
//! operation has one) and maps the backend's JSON into typed values. Every
//! failure is an `audit_client::Error`; input validation failures are
//! `Error::Invalid` raised inside the limited operation, so they never
//! consume budget.

pub mod admin;
pub mod auth;
pub mod chat;
pub mod model;
pub mod users;
pub mod validation;

#[cfg(test)]
mod testing;

use audit_client::ApiClient;
use audit_limiter::Presets;

pub use admin::AdminChatApi;
pub use auth::AuthApi;
pub use chat::ChatApi;
pub use model::*;
pub use users::UserApi;
pub use validation::ValidationError;

/// Every domain module over one shared client.
#[derive(Clone)]
pub struct AuditApi {
    pub auth: AuthApi,
    pub chat: ChatApi,
    pub users: UserApi,
    pub admin: AdminChatApi,
}

impl AuditApi {
    pub fn new(api: ApiClient, presets: &Presets) -> Self {
        Self {
            auth: AuthApi::new(api.clone(), presets.auth.clone()),
            chat: ChatApi::new(api.clone(), presets.chat.clone()),
            users: UserApi::new(api.clone(), presets.api.clone()),
            admin: AdminChatApi::new(api, presets.api.clone()),
        }
    }
}
