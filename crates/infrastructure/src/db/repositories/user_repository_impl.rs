//! 用户Repository实现

use std::sync::Arc;

use async_trait::async_trait;
use domain::{RepositoryError, UserId, UserProfile, UserRepository};
use sqlx::{query, query_as, FromRow};

use crate::db::{storage_error, DbPool};

/// 数据库用户模型
#[derive(Debug, Clone, FromRow)]
struct DbUser {
    pub id: String,
    pub phone: String,
    pub fullname: String,
}

impl From<DbUser> for UserProfile {
    fn from(db_user: DbUser) -> Self {
        UserProfile {
            id: UserId::new(db_user.id),
            phone: db_user.phone,
            fullname: db_user.fullname,
        }
    }
}

/// 用户Repository实现
pub struct PostgresUserRepository {
    pool: Arc<DbPool>,
}

impl PostgresUserRepository {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }

    /// 写入或覆盖用户资料
    pub async fn upsert(&self, profile: &UserProfile) -> Result<(), RepositoryError> {
        query(
            r#"
            INSERT INTO users (id, phone, fullname)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE SET phone = EXCLUDED.phone, fullname = EXCLUDED.fullname
            "#,
        )
        .bind(profile.id.as_str())
        .bind(&profile.phone)
        .bind(&profile.fullname)
        .execute(&*self.pool)
        .await
        .map_err(storage_error)?;

        Ok(())
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<UserProfile>, RepositoryError> {
        let row = query_as::<_, DbUser>("SELECT id, phone, fullname FROM users WHERE id = $1")
            .bind(id.as_str())
            .fetch_optional(&*self.pool)
            .await
            .map_err(storage_error)?;

        Ok(row.map(UserProfile::from))
    }

    async fn list(&self) -> Result<Vec<UserProfile>, RepositoryError> {
        let rows = query_as::<_, DbUser>(
            "SELECT id, phone, fullname FROM users ORDER BY created_at ASC",
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(storage_error)?;

        Ok(rows.into_iter().map(UserProfile::from).collect())
    }
}
