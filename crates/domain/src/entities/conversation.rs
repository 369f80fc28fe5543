//! 会话实体
//!
//! 两个成员之间的私聊会话，记录最后一条消息以及每个成员的已读时间。

use chrono::{TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{DomainError, DomainResult};
use crate::value_objects::{ConversationId, Timestamp, UserId};

/// 会话列表中最后一条消息的预览长度
pub const LAST_MESSAGE_PREVIEW_CHARS: usize = 15;

/// 成员的已读记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeenMarker {
    pub user_id: UserId,
    pub last_seen_at: Timestamp,
}

/// 会话
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    pub members: Vec<UserId>,
    pub last_message: Option<String>,
    pub last_message_time: Option<Timestamp>,
    pub last_message_sender_id: Option<UserId>,
    pub not_seen_by: Vec<SeenMarker>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// “从未读过”使用的时间点
pub fn never_seen() -> Timestamp {
    Utc.timestamp_opt(0, 0).single().unwrap_or_default()
}

impl Conversation {
    /// 创建两个成员之间的新会话
    pub fn new(sender_id: UserId, receiver_id: UserId, now: Timestamp) -> DomainResult<Self> {
        if sender_id.as_str().is_empty() || receiver_id.as_str().is_empty() {
            return Err(DomainError::validation_error(
                "members",
                "senderId and receiverId are required",
            ));
        }

        Ok(Self {
            id: ConversationId::new(),
            members: vec![sender_id, receiver_id],
            last_message: None,
            last_message_time: None,
            last_message_sender_id: None,
            not_seen_by: Vec::new(),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn is_member(&self, user_id: &UserId) -> bool {
        self.members.iter().any(|m| m == user_id)
    }

    /// 返回会话中的另一方
    pub fn counterpart(&self, user_id: &UserId) -> Option<&UserId> {
        self.members.iter().find(|m| *m != user_id)
    }

    /// 记录新消息：更新最后消息字段，并把接收方标记为未读
    pub fn record_message(&mut self, sender_id: &UserId, message: &str, now: Timestamp) {
        if let Some(receiver_id) = self.counterpart(sender_id).cloned() {
            match self.not_seen_by.iter_mut().find(|m| m.user_id == receiver_id) {
                Some(marker) => marker.last_seen_at = never_seen(),
                None => self.not_seen_by.push(SeenMarker {
                    user_id: receiver_id,
                    last_seen_at: never_seen(),
                }),
            }
        }

        self.last_message = Some(message.to_owned());
        self.last_message_time = Some(now);
        self.last_message_sender_id = Some(sender_id.clone());
        self.updated_at = now;
    }

    /// 标记用户已读到 `now`
    pub fn mark_seen(&mut self, user_id: &UserId, now: Timestamp) {
        match self.not_seen_by.iter_mut().find(|m| &m.user_id == user_id) {
            Some(marker) => marker.last_seen_at = now,
            None => self.not_seen_by.push(SeenMarker {
                user_id: user_id.clone(),
                last_seen_at: now,
            }),
        }
        self.updated_at = now;
    }

    /// 用户是否已读最后一条消息
    pub fn has_seen(&self, user_id: &UserId) -> bool {
        let Some(marker) = self.not_seen_by.iter().find(|m| &m.user_id == user_id) else {
            return true;
        };
        match self.last_message_time {
            Some(last) => marker.last_seen_at >= last,
            None => true,
        }
    }

    /// 最后一条消息的预览
    pub fn last_message_preview(&self) -> String {
        match &self.last_message {
            Some(text) if text.chars().count() > LAST_MESSAGE_PREVIEW_CHARS => {
                let head: String = text.chars().take(LAST_MESSAGE_PREVIEW_CHARS).collect();
                format!("{head}...")
            }
            Some(text) => text.clone(),
            None => "No messages yet".to_string(),
        }
    }
}
