//! REST 接口的请求与响应结构，字段名沿用现有客户端使用的形状

use domain::{
    ChatMessage, Conversation, ConversationId, MessageId, SeenMarker, SenderSummary, Timestamp,
    UserId, UserProfile,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserContact {
    pub phone: String,
    pub fullname: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserListItem {
    pub user: UserContact,
    pub user_id: UserId,
}

impl From<UserProfile> for UserListItem {
    fn from(profile: UserProfile) -> Self {
        Self {
            user: UserContact {
                phone: profile.phone,
                fullname: profile.fullname,
            },
            user_id: profile.id,
        }
    }
}

pub fn sender_summary(profile: UserProfile) -> SenderSummary {
    SenderSummary {
        phone: profile.phone,
        fullname: profile.fullname,
        id: profile.id,
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateConversationRequest {
    pub sender_id: Option<String>,
    pub receiver_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PostMessageRequest {
    pub conversation_id: Option<String>,
    pub sender_id: Option<String>,
    pub message: Option<String>,
    pub receiver_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MarkSeenRequest {
    pub user_id: Option<String>,
}

/// 会话记录
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationView {
    #[serde(rename = "_id")]
    pub id: ConversationId,
    pub members: Vec<UserId>,
    pub last_message: Option<String>,
    pub last_message_time: Option<Timestamp>,
    pub last_message_sender_id: Option<UserId>,
    pub not_seen_by: Vec<SeenMarker>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<Conversation> for ConversationView {
    fn from(conversation: Conversation) -> Self {
        Self {
            id: conversation.id,
            members: conversation.members,
            last_message: conversation.last_message,
            last_message_time: conversation.last_message_time,
            last_message_sender_id: conversation.last_message_sender_id,
            not_seen_by: conversation.not_seen_by,
            created_at: conversation.created_at,
            updated_at: conversation.updated_at,
        }
    }
}

/// 会话列表中的一项，从当前用户的视角描述
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    pub user: SenderSummary,
    pub conversation_id: ConversationId,
    pub last_message: String,
    pub last_message_time: Option<Timestamp>,
    pub last_message_sender_id: Option<UserId>,
    pub is_last_message_from_current_user: bool,
    pub has_seen: bool,
    pub not_seen_by: Vec<SeenMarker>,
}

/// 消息记录
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageView {
    #[serde(rename = "_id")]
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub sender_id: UserId,
    pub message: String,
    pub seen: bool,
    pub seen_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

impl From<ChatMessage> for MessageView {
    fn from(message: ChatMessage) -> Self {
        Self {
            id: message.id,
            conversation_id: message.conversation_id,
            sender_id: message.sender_id,
            message: message.message,
            seen: message.seen,
            seen_at: message.seen_at,
            created_at: message.created_at,
        }
    }
}

/// 会话内的消息列表项
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageListItem {
    pub user: SenderSummary,
    pub message: String,
    pub created_at: Timestamp,
    #[serde(rename = "_id")]
    pub id: MessageId,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationStarted {
    pub message: String,
    pub conversation_id: ConversationId,
}

/// 发送消息的结果：新建会话时只返回会话ID，追加到已有会话时返回消息记录
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MessagePosted {
    ConversationStarted(ConversationStarted),
    Appended(MessageView),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeenReceipt {
    pub message: String,
    pub conversation_id: ConversationId,
}
