//! 聊天消息实体

use serde::{Deserialize, Serialize};

use crate::errors::{DomainError, DomainResult};
use crate::value_objects::{ConversationId, MessageId, Timestamp, UserId};

/// 持久化的聊天消息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub sender_id: UserId,
    pub message: String,
    pub seen: bool,
    pub seen_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

impl ChatMessage {
    pub fn new(
        conversation_id: ConversationId,
        sender_id: UserId,
        message: impl Into<String>,
        now: Timestamp,
    ) -> DomainResult<Self> {
        let message = message.into();
        if sender_id.as_str().is_empty() || message.is_empty() {
            return Err(DomainError::validation_error(
                "message",
                "Please provide senderId and message",
            ));
        }

        Ok(Self {
            id: MessageId::new(),
            conversation_id,
            sender_id,
            message,
            seen: false,
            seen_at: None,
            created_at: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_message_requires_sender_and_body() {
        let conv = ConversationId::new();
        assert!(ChatMessage::new(conv, UserId::new("alice"), "", Utc::now()).is_err());
        assert!(ChatMessage::new(conv, UserId::new(""), "hi", Utc::now()).is_err());

        let msg = ChatMessage::new(conv, UserId::new("alice"), "hi", Utc::now()).unwrap();
        assert!(!msg.seen);
        assert_eq!(msg.conversation_id, conv);
    }
}
