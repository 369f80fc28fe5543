//! Repository实现模块
//!
//! 持久化网关的 PostgreSQL 实现

pub mod conversation_repository_impl;
pub mod message_repository_impl;
pub mod user_repository_impl;

pub use conversation_repository_impl::PostgresConversationRepository;
pub use message_repository_impl::PostgresMessageRepository;
pub use user_repository_impl::PostgresUserRepository;
