//! 会话Repository实现

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::{
    Conversation, ConversationId, ConversationRepository, RepositoryError, SeenMarker, UserId,
};
use sqlx::{query, query_as, types::Json, FromRow};
use uuid::Uuid;

use crate::db::{storage_error, DbPool};

const COLUMNS: &str = "id, members, last_message, last_message_time, last_message_sender_id, \
                       not_seen_by, created_at, updated_at";

/// 数据库会话模型
#[derive(Debug, Clone, FromRow)]
struct DbConversation {
    pub id: Uuid,
    pub members: Vec<String>,
    pub last_message: Option<String>,
    pub last_message_time: Option<DateTime<Utc>>,
    pub last_message_sender_id: Option<String>,
    pub not_seen_by: Json<Vec<SeenMarker>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<DbConversation> for Conversation {
    fn from(row: DbConversation) -> Self {
        Conversation {
            id: ConversationId::from(row.id),
            members: row.members.into_iter().map(UserId::new).collect(),
            last_message: row.last_message,
            last_message_time: row.last_message_time,
            last_message_sender_id: row.last_message_sender_id.map(UserId::new),
            not_seen_by: row.not_seen_by.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

fn member_ids(conversation: &Conversation) -> Vec<String> {
    conversation
        .members
        .iter()
        .map(|m| m.as_str().to_string())
        .collect()
}

/// 会话Repository实现
pub struct PostgresConversationRepository {
    pool: Arc<DbPool>,
}

impl PostgresConversationRepository {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ConversationRepository for PostgresConversationRepository {
    async fn create(&self, conversation: Conversation) -> Result<Conversation, RepositoryError> {
        let result = query(
            r#"INSERT INTO conversations
               (id, members, last_message, last_message_time, last_message_sender_id,
                not_seen_by, created_at, updated_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
               ON CONFLICT (id) DO NOTHING"#,
        )
        .bind(conversation.id.0)
        .bind(member_ids(&conversation))
        .bind(conversation.last_message.as_deref())
        .bind(conversation.last_message_time)
        .bind(conversation.last_message_sender_id.as_ref().map(UserId::as_str))
        .bind(Json(&conversation.not_seen_by))
        .bind(conversation.created_at)
        .bind(conversation.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(storage_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::Conflict);
        }
        Ok(conversation)
    }

    async fn find_by_id(
        &self,
        id: ConversationId,
    ) -> Result<Option<Conversation>, RepositoryError> {
        let row = query_as::<_, DbConversation>(&format!(
            "SELECT {COLUMNS} FROM conversations WHERE id = $1"
        ))
        .bind(id.0)
        .fetch_optional(&*self.pool)
        .await
        .map_err(storage_error)?;

        Ok(row.map(Conversation::from))
    }

    async fn list_for_member(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<Conversation>, RepositoryError> {
        let rows = query_as::<_, DbConversation>(&format!(
            "SELECT {COLUMNS} FROM conversations WHERE $1 = ANY(members) ORDER BY created_at ASC"
        ))
        .bind(user_id.as_str())
        .fetch_all(&*self.pool)
        .await
        .map_err(storage_error)?;

        Ok(rows.into_iter().map(Conversation::from).collect())
    }

    async fn update(&self, conversation: Conversation) -> Result<Conversation, RepositoryError> {
        let result = query(
            r#"UPDATE conversations
               SET members = $2, last_message = $3, last_message_time = $4,
                   last_message_sender_id = $5, not_seen_by = $6, updated_at = $7
               WHERE id = $1"#,
        )
        .bind(conversation.id.0)
        .bind(member_ids(&conversation))
        .bind(conversation.last_message.as_deref())
        .bind(conversation.last_message_time)
        .bind(conversation.last_message_sender_id.as_ref().map(UserId::as_str))
        .bind(Json(&conversation.not_seen_by))
        .bind(conversation.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(storage_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(conversation)
    }
}
