//! 内存持久化网关
//!
//! 用于本地运行和测试。用户资料由外部维护，这里只提供 `seed_user` 写入。

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use domain::{
    ChatMessage, Conversation, ConversationId, ConversationRepository, MessageRepository,
    RepositoryError, UserId, UserProfile, UserRepository,
};
use tokio::sync::RwLock;

#[derive(Clone, Default)]
pub struct InMemoryStore {
    /// 用户按写入顺序保存
    users: Arc<RwLock<Vec<UserProfile>>>,
    conversations: Arc<RwLock<HashMap<ConversationId, Conversation>>>,
    messages: Arc<RwLock<Vec<ChatMessage>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 写入或覆盖用户资料
    pub async fn seed_user(&self, profile: UserProfile) {
        let mut users = self.users.write().await;
        match users.iter_mut().find(|u| u.id == profile.id) {
            Some(existing) => *existing = profile,
            None => users.push(profile),
        }
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<UserProfile>, RepositoryError> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| &u.id == id).cloned())
    }

    async fn list(&self) -> Result<Vec<UserProfile>, RepositoryError> {
        Ok(self.users.read().await.clone())
    }
}

#[async_trait]
impl ConversationRepository for InMemoryStore {
    async fn create(&self, conversation: Conversation) -> Result<Conversation, RepositoryError> {
        let mut conversations = self.conversations.write().await;
        if conversations.contains_key(&conversation.id) {
            return Err(RepositoryError::Conflict);
        }
        conversations.insert(conversation.id, conversation.clone());
        Ok(conversation)
    }

    async fn find_by_id(
        &self,
        id: ConversationId,
    ) -> Result<Option<Conversation>, RepositoryError> {
        Ok(self.conversations.read().await.get(&id).cloned())
    }

    async fn list_for_member(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<Conversation>, RepositoryError> {
        let conversations = self.conversations.read().await;
        let mut found: Vec<Conversation> = conversations
            .values()
            .filter(|c| c.is_member(user_id))
            .cloned()
            .collect();
        found.sort_by_key(|c| c.created_at);
        Ok(found)
    }

    async fn update(&self, conversation: Conversation) -> Result<Conversation, RepositoryError> {
        let mut conversations = self.conversations.write().await;
        match conversations.get_mut(&conversation.id) {
            Some(existing) => {
                *existing = conversation.clone();
                Ok(conversation)
            }
            None => Err(RepositoryError::NotFound),
        }
    }
}

#[async_trait]
impl MessageRepository for InMemoryStore {
    async fn append(&self, message: ChatMessage) -> Result<ChatMessage, RepositoryError> {
        self.messages.write().await.push(message.clone());
        Ok(message)
    }

    async fn list_by_conversation(
        &self,
        conversation_id: ConversationId,
    ) -> Result<Vec<ChatMessage>, RepositoryError> {
        let messages = self.messages.read().await;
        Ok(messages
            .iter()
            .filter(|m| m.conversation_id == conversation_id)
            .cloned()
            .collect())
    }
}
