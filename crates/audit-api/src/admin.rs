//! Conversation moderation (admin)
//!
//! Same endpoints as `ChatApi`, limited by the general `api` preset instead
//! of the chat one.

use std::sync::Arc;

use audit_client::{ApiClient, Error, Result};
use audit_limiter::RateLimiter;
use serde_json::json;

use crate::chat::conversations_from;
use crate::model::{Ack, Conversation, Message, MessagePage};

pub const LIST_KEY: &str = "admin_chat_list";
pub const DELETE_KEY: &str = "admin_chat_delete";

/// Limiter key for fetching one conversation's messages.
pub fn messages_key(chat_id: &str) -> String {
    format!("admin_chat_messages_{chat_id}")
}

#[derive(Clone)]
pub struct AdminChatApi {
    api: ApiClient,
    limiter: Arc<RateLimiter>,
}

impl AdminChatApi {
    pub fn new(api: ApiClient, limiter: Arc<RateLimiter>) -> Self {
        Self { api, limiter }
    }

    pub async fn all_conversations(&self) -> Result<Vec<Conversation>> {
        self.limiter
            .execute(LIST_KEY, || async {
                let response = self.api.get("/chat/list").await?;
                Ok::<_, Error>(conversations_from(&response.data))
            })
            .await
    }

    /// Messages of any conversation; a body without `data` is an empty list.
    pub async fn conversation_messages(&self, chat_id: &str) -> Result<Vec<Message>> {
        self.limiter
            .execute(&messages_key(chat_id), || async {
                let page: MessagePage = self
                    .api
                    .post("/chat/messages", &json!({ "chatId": chat_id }))
                    .await?
                    .json()?;
                Ok::<_, Error>(page.data.into_iter().map(Message::from).collect())
            })
            .await
    }

    pub async fn delete_conversation(&self, chat_id: &str) -> Result<Ack> {
        self.limiter
            .execute(DELETE_KEY, || async {
                self.api
                    .post("/chat/delete", &json!({ "chatId": chat_id }))
                    .await?
                    .json()
            })
            .await
    }
}
