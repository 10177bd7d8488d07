//! The caller's own conversations
//!
//! Every call except `delete_conversation` goes through the shared `chat`
//! limiter under its own key; message fetches are keyed per conversation.

use std::sync::Arc;

use audit_client::{ApiClient, Error, Result};
use audit_limiter::RateLimiter;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::model::{
    Ack, Conversation, ConversationRecord, CreatedChat, Message, MessagePage, SentMessage,
    list_payload,
};
use crate::validation::{validate_chat_name, validate_message_text};

pub const LIST_KEY: &str = "chat_get_conversations";
pub const CREATE_KEY: &str = "chat_create";
pub const SEND_KEY: &str = "chat_send_message";

/// Limiter key for fetching one conversation's messages.
pub fn messages_key(chat_id: &str) -> String {
    format!("chat_get_messages_{chat_id}")
}

#[derive(Clone)]
pub struct ChatApi {
    api: ApiClient,
    limiter: Arc<RateLimiter>,
}

impl ChatApi {
    pub fn new(api: ApiClient, limiter: Arc<RateLimiter>) -> Self {
        Self { api, limiter }
    }

    pub async fn list_conversations(&self) -> Result<Vec<Conversation>> {
        self.limiter
            .execute(LIST_KEY, || async {
                let response = self.api.get("/chat/list").await?;
                Ok::<_, Error>(conversations_from(&response.data))
            })
            .await
    }

    pub async fn create_chat(&self, name: &str) -> Result<Conversation> {
        self.limiter
            .execute(CREATE_KEY, || async {
                validate_chat_name(name)?;
                let created: CreatedChat = self
                    .api
                    .post("/chat/create", &json!({ "chatName": name }))
                    .await?
                    .json()?;
                debug!(chat_id = %created.chat.id, "conversation created");
                Ok::<_, Error>(Conversation::from(created.chat))
            })
            .await
    }

    /// Send a prompt; returns the assistant's reply.
    pub async fn send_message(&self, chat_id: &str, prompt: &str) -> Result<Message> {
        self.limiter
            .execute(SEND_KEY, || async {
                validate_message_text(prompt)?;
                let sent: SentMessage = self
                    .api
                    .post("/chat/message", &json!({ "chatId": chat_id, "prompt": prompt }))
                    .await?
                    .json()?;
                Ok::<_, Error>(sent.message)
            })
            .await
    }

    pub async fn conversation_messages(&self, chat_id: &str) -> Result<Vec<Message>> {
        self.limiter
            .execute(&messages_key(chat_id), || async {
                let page: MessagePage = self
                    .api
                    .post("/chat/messages", &json!({ "chatId": chat_id, "page": 1 }))
                    .await?
                    .json()?;
                Ok::<_, Error>(page.data.into_iter().map(Message::from).collect())
            })
            .await
    }

    pub async fn delete_conversation(&self, chat_id: &str) -> Result<Ack> {
        self.api
            .post("/chat/delete", &json!({ "chatId": chat_id }))
            .await?
            .json()
    }
}

/// Map a list response, skipping entries that are not conversations.
pub(crate) fn conversations_from(data: &Value) -> Vec<Conversation> {
    list_payload(data)
        .iter()
        .filter_map(|item| match ConversationRecord::deserialize(item) {
            Ok(record) => Some(Conversation::from(record)),
            Err(e) => {
                warn!(error = %e, "skipping malformed conversation");
                None
            }
        })
        .collect()
}
