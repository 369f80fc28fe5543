//! 会话Repository接口定义

use async_trait::async_trait;

use crate::entities::conversation::Conversation;
use crate::errors::RepositoryError;
use crate::value_objects::{ConversationId, UserId};

/// 会话Repository接口
#[cfg_attr(feature = "testing", mockall::automock)]
#[async_trait]
pub trait ConversationRepository: Send + Sync {
    /// 创建会话
    async fn create(&self, conversation: Conversation) -> Result<Conversation, RepositoryError>;

    /// 根据ID查找会话
    async fn find_by_id(
        &self,
        id: ConversationId,
    ) -> Result<Option<Conversation>, RepositoryError>;

    /// 列出某个成员参与的所有会话
    async fn list_for_member(&self, user_id: &UserId)
        -> Result<Vec<Conversation>, RepositoryError>;

    /// 保存会话的最后消息和已读状态
    async fn update(&self, conversation: Conversation) -> Result<Conversation, RepositoryError>;
}
