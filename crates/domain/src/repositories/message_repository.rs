//! 消息Repository接口定义

use async_trait::async_trait;

use crate::entities::message::ChatMessage;
use crate::errors::RepositoryError;
use crate::value_objects::ConversationId;

/// 消息Repository接口
#[cfg_attr(feature = "testing", mockall::automock)]
#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// 追加消息
    async fn append(&self, message: ChatMessage) -> Result<ChatMessage, RepositoryError>;

    /// 按时间顺序列出会话中的消息
    async fn list_by_conversation(
        &self,
        conversation_id: ConversationId,
    ) -> Result<Vec<ChatMessage>, RepositoryError>;
}
