//! User directory (admin)
//!
//! Both calls go through the general `api` limiter.

use std::sync::Arc;

use audit_client::{ApiClient, Error, Result};
use audit_limiter::RateLimiter;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::warn;

use crate::model::{Ack, BasicUser};

pub const LIST_KEY: &str = "user_all";
pub const STATUS_KEY: &str = "user_status";

#[derive(Clone)]
pub struct UserApi {
    api: ApiClient,
    limiter: Arc<RateLimiter>,
}

impl UserApi {
    pub fn new(api: ApiClient, limiter: Arc<RateLimiter>) -> Self {
        Self { api, limiter }
    }

    /// Every registered user. Accepts `{"users": [...]}` or a bare array.
    pub async fn all_users(&self) -> Result<Vec<BasicUser>> {
        self.limiter
            .execute(LIST_KEY, || async {
                let response = self.api.get("/user/all").await?;
                Ok::<_, Error>(users_from(&response.data))
            })
            .await
    }

    /// Activate or deactivate an account.
    pub async fn update_user_status(&self, user_id: &str, is_active: bool) -> Result<Ack> {
        self.limiter
            .execute(STATUS_KEY, || async {
                self.api
                    .patch(
                        &format!("/user/{user_id}/status"),
                        &json!({ "isActive": is_active }),
                    )
                    .await?
                    .json()
            })
            .await
    }
}

fn users_from(data: &Value) -> Vec<BasicUser> {
    let list = match (&data["users"], data) {
        (Value::Array(users), _) => users.as_slice(),
        (_, Value::Array(users)) => users.as_slice(),
        _ => &[],
    };
    list.iter()
        .filter_map(|item| match BasicUser::deserialize(item) {
            Ok(user) => Some(user),
            Err(e) => {
                warn!(error = %e, "skipping malformed user");
                None
            }
        })
        .collect()
}
