//! Backend payloads and the typed values handed to callers
//!
//! The backend speaks Mongo-style JSON (`_id`, `chatName`, `createdAt`);
//! callers get flat records (`id`, `title`, `timestamp`). Timestamps are
//! passed through as the ISO-8601 strings the backend sends.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

#[derive(Debug, Clone, Serialize)]
pub struct LoginCredentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterData {
    pub email: String,
    pub password: String,
    pub firstname: String,
    pub lastname: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(rename = "_id", alias = "id", default)]
    pub id: String,
    pub firstname: String,
    pub lastname: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

/// Body of a login or registration response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub user: UserProfile,
    pub token: String,
    #[serde(default)]
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ProfileEnvelope {
    pub user: UserProfile,
}

/// Partial profile update; unset fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub firstname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lastname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationUser {
    #[serde(rename(deserialize = "_id"), alias = "id", default)]
    pub id: String,
    #[serde(default)]
    pub firstname: String,
    #[serde(default)]
    pub lastname: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Conversation {
    pub id: String,
    pub title: String,
    pub timestamp: String,
    pub user: Option<ConversationUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ConversationRecord {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub chat_name: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub user: Option<ConversationUser>,
}

impl From<ConversationRecord> for Conversation {
    fn from(record: ConversationRecord) -> Self {
        Self {
            id: record.id,
            title: record.chat_name,
            timestamp: record.created_at,
            user: record.user,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreatedChat {
    pub chat: ConversationRecord,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub text: String,
    /// `user` or `bot`
    pub sender: String,
    pub timestamp: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SentMessage {
    pub message: Message,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MessageRecord {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub created_at: String,
}

impl From<MessageRecord> for Message {
    fn from(record: MessageRecord) -> Self {
        Self {
            id: record.id,
            text: record.message,
            sender: record.kind,
            timestamp: record.created_at,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct MessagePage {
    #[serde(default)]
    pub data: Vec<MessageRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BasicUser {
    #[serde(rename(deserialize = "_id"), alias = "id", default)]
    pub id: String,
    pub firstname: String,
    pub lastname: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

/// Acknowledgement bodies such as `{"message": "Chat deleted successfully"}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Ack {
    #[serde(default)]
    pub message: String,
}

/// The list inside a list response: the body itself when it is an array,
/// otherwise the first array-valued field of an object body.
pub(crate) fn list_payload(data: &Value) -> &[Value] {
    match data {
        Value::Array(items) => items.as_slice(),
        Value::Object(fields) => match fields.values().find_map(Value::as_array) {
            Some(items) => items.as_slice(),
            None => {
                warn!("list response is an object without an array field");
                &[]
            }
        },
        other => {
            warn!(kind = value_kind(other), "unexpected list response shape");
            &[]
        }
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
