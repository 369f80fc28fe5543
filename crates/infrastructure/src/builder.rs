use std::sync::Arc;

use config::{SeedUser, StorageBackend, StorageConfig};
use domain::{
    ConversationRepository, MessageRepository, RepositoryError, UserProfile, UserRepository,
};
use thiserror::Error;
use tracing::info;

use crate::{
    db::{Db, PostgresConversationRepository, PostgresMessageRepository, PostgresUserRepository},
    memory::InMemoryStore,
    websocket::InMemoryConnectionHub,
};

#[derive(Debug, Error)]
pub enum InfrastructureError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("storage backend {0:?} requires database_url")]
    MissingDatabaseUrl(StorageBackend),
    #[error("failed to seed user profiles: {0}")]
    Seed(#[from] RepositoryError),
}

/// 持久化网关的三个接口
#[derive(Clone)]
pub struct Storage {
    pub users: Arc<dyn UserRepository>,
    pub conversations: Arc<dyn ConversationRepository>,
    pub messages: Arc<dyn MessageRepository>,
}

impl Storage {
    pub fn in_memory(store: InMemoryStore) -> Self {
        let store = Arc::new(store);
        Self {
            users: store.clone(),
            conversations: store.clone(),
            messages: store,
        }
    }
}

#[derive(Clone)]
pub struct Infrastructure {
    pub storage: Storage,
    pub connections: Arc<InMemoryConnectionHub>,
}

impl Infrastructure {
    /// 按配置选择持久化后端；PostgreSQL 后端会先执行迁移。
    /// `seed_users` 在两种后端上都会写入
    pub async fn connect(config: &StorageConfig) -> Result<Self, InfrastructureError> {
        let storage = match config.backend {
            StorageBackend::Memory => {
                let store = InMemoryStore::new();
                for profile in config.seed_users.iter().map(seed_profile) {
                    store.seed_user(profile).await;
                }
                info!(seeded = config.seed_users.len(), "使用内存持久化网关");
                Storage::in_memory(store)
            }
            StorageBackend::Postgres => {
                let url = config
                    .database_url
                    .as_deref()
                    .ok_or(InfrastructureError::MissingDatabaseUrl(config.backend))?;
                let pool = Arc::new(Db::create_pool(url, config.max_connections).await?);
                Db::migrate(&pool).await?;
                info!(max_connections = config.max_connections, "PostgreSQL 持久化网关已就绪");

                let users = PostgresUserRepository::new(pool.clone());
                for profile in config.seed_users.iter().map(seed_profile) {
                    users.upsert(&profile).await?;
                }
                if !config.seed_users.is_empty() {
                    info!(seeded = config.seed_users.len(), "user profiles seeded");
                }

                Storage {
                    users: Arc::new(users),
                    conversations: Arc::new(PostgresConversationRepository::new(pool.clone())),
                    messages: Arc::new(PostgresMessageRepository::new(pool)),
                }
            }
        };

        Ok(Self {
            storage,
            connections: Arc::new(InMemoryConnectionHub::new()),
        })
    }

    /// 使用给定内存存储构建，测试中用于预置用户
    pub fn with_memory_store(store: InMemoryStore) -> Self {
        Self {
            storage: Storage::in_memory(store),
            connections: Arc::new(InMemoryConnectionHub::new()),
        }
    }
}

fn seed_profile(seed: &SeedUser) -> UserProfile {
    UserProfile::new(seed.id.clone(), seed.phone.clone(), seed.fullname.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{UserId, UserProfile};

    #[tokio::test]
    async fn test_memory_backend_connects_without_database() {
        let config = StorageConfig {
            backend: StorageBackend::Memory,
            database_url: None,
            max_connections: 1,
            seed_users: Vec::new(),
        };
        let infra = Infrastructure::connect(&config).await.unwrap();
        assert!(infra.storage.users.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_postgres_backend_requires_url() {
        let config = StorageConfig {
            backend: StorageBackend::Postgres,
            database_url: None,
            max_connections: 1,
            seed_users: Vec::new(),
        };
        assert!(matches!(
            Infrastructure::connect(&config).await,
            Err(InfrastructureError::MissingDatabaseUrl(StorageBackend::Postgres))
        ));
    }

    #[tokio::test]
    async fn test_memory_backend_applies_seed_users() {
        let config = StorageConfig {
            backend: StorageBackend::Memory,
            database_url: None,
            max_connections: 1,
            seed_users: vec![
                SeedUser {
                    id: "A".into(),
                    phone: "+100".into(),
                    fullname: "Alice".into(),
                },
                SeedUser {
                    id: "A".into(),
                    phone: "+101".into(),
                    fullname: "Alice Again".into(),
                },
                SeedUser {
                    id: "B".into(),
                    phone: "+200".into(),
                    fullname: "Bob".into(),
                },
            ],
        };
        let infra = Infrastructure::connect(&config).await.unwrap();

        let users = infra.storage.users.list().await.unwrap();
        assert_eq!(users.len(), 2);
        let alice = infra.storage.users.find_by_id(&UserId::new("A")).await.unwrap();
        assert_eq!(alice.map(|u| u.fullname), Some("Alice Again".to_string()));
    }

    #[tokio::test]
    async fn test_memory_store_is_shared_across_gateways() {
        let store = InMemoryStore::new();
        store.seed_user(UserProfile::new("u1", "+1", "One")).await;

        let infra = Infrastructure::with_memory_store(store);
        let found = infra.storage.users.find_by_id(&UserId::new("u1")).await.unwrap();
        assert_eq!(found.map(|u| u.fullname), Some("One".to_string()));
    }
}
