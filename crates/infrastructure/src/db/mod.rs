//! Database utilities and repositories (Core DB Layer)

use sqlx::{Pool, Postgres};

pub mod repositories;

pub use repositories::{
    PostgresConversationRepository, PostgresMessageRepository, PostgresUserRepository,
};

pub type DbPool = Pool<Postgres>;

pub struct Db;

impl Db {
    pub async fn create_pool(database_url: &str, max_size: u32) -> Result<DbPool, sqlx::Error> {
        sqlx::postgres::PgPoolOptions::new()
            .max_connections(max_size)
            .connect(database_url)
            .await
    }

    /// 执行仓库根目录下 `migrations/` 中的迁移
    pub async fn migrate(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(pool).await
    }
}

pub(crate) fn storage_error(e: sqlx::Error) -> domain::RepositoryError {
    domain::RepositoryError::storage(e.to_string())
}
