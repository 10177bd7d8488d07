//! Input checks run before chat calls reach the network

/// Shortest accepted conversation name
pub const CHAT_NAME_MIN: usize = 3;
/// Longest accepted conversation name
pub const CHAT_NAME_MAX: usize = 50;
/// Longest accepted message
pub const MESSAGE_MAX: usize = 2000;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl From<ValidationError> for audit_client::Error {
    fn from(e: ValidationError) -> Self {
        audit_client::Error::Invalid {
            field: e.field.to_string(),
            message: e.message,
        }
    }
}

/// Lengths are counted in characters, not bytes.
pub fn validate_chat_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::new("chatName", "Chat name is required"));
    }
    let len = name.chars().count();
    if len < CHAT_NAME_MIN {
        return Err(ValidationError::new(
            "chatName",
            format!("Chat name must be at least {CHAT_NAME_MIN} characters"),
        ));
    }
    if len > CHAT_NAME_MAX {
        return Err(ValidationError::new(
            "chatName",
            format!("Chat name cannot exceed {CHAT_NAME_MAX} characters"),
        ));
    }
    Ok(())
}

pub fn validate_message_text(text: &str) -> Result<(), ValidationError> {
    if text.trim().is_empty() {
        return Err(ValidationError::new("prompt", "Message cannot be empty"));
    }
    if text.chars().count() > MESSAGE_MAX {
        return Err(ValidationError::new(
            "prompt",
            format!("Message cannot exceed {MESSAGE_MAX} characters"),
        ));
    }
    Ok(())
}
