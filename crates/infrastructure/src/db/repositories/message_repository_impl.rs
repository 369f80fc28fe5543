//! 消息Repository实现

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::{ChatMessage, ConversationId, MessageId, MessageRepository, RepositoryError, UserId};
use sqlx::{query, query_as, FromRow};
use uuid::Uuid;

use crate::db::{storage_error, DbPool};

/// 数据库消息模型
#[derive(Debug, Clone, FromRow)]
struct DbMessage {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: String,
    pub message: String,
    pub seen: bool,
    pub seen_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<DbMessage> for ChatMessage {
    fn from(row: DbMessage) -> Self {
        ChatMessage {
            id: MessageId::from(row.id),
            conversation_id: ConversationId::from(row.conversation_id),
            sender_id: UserId::new(row.sender_id),
            message: row.message,
            seen: row.seen,
            seen_at: row.seen_at,
            created_at: row.created_at,
        }
    }
}

/// 消息Repository实现
pub struct PostgresMessageRepository {
    pool: Arc<DbPool>,
}

impl PostgresMessageRepository {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageRepository for PostgresMessageRepository {
    async fn append(&self, message: ChatMessage) -> Result<ChatMessage, RepositoryError> {
        query(
            r#"INSERT INTO messages
               (id, conversation_id, sender_id, message, seen, seen_at, created_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7)"#,
        )
        .bind(message.id.0)
        .bind(message.conversation_id.0)
        .bind(message.sender_id.as_str())
        .bind(&message.message)
        .bind(message.seen)
        .bind(message.seen_at)
        .bind(message.created_at)
        .execute(&*self.pool)
        .await
        .map_err(storage_error)?;

        Ok(message)
    }

    async fn list_by_conversation(
        &self,
        conversation_id: ConversationId,
    ) -> Result<Vec<ChatMessage>, RepositoryError> {
        let rows = query_as::<_, DbMessage>(
            r#"SELECT id, conversation_id, sender_id, message, seen, seen_at, created_at
               FROM messages WHERE conversation_id = $1 ORDER BY created_at ASC"#,
        )
        .bind(conversation_id.0)
        .fetch_all(&*self.pool)
        .await
        .map_err(storage_error)?;

        Ok(rows.into_iter().map(ChatMessage::from).collect())
    }
}
