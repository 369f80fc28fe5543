//! 基础设施层实现。
//!
//! 提供连接中枢、持久化网关（内存与 PostgreSQL）等适配器，
//! 实现领域层定义的接口。

pub mod builder;
pub mod db;
pub mod memory;
pub mod websocket;

pub use builder::{Infrastructure, InfrastructureError, Storage};
pub use db::{Db, DbPool};
pub use memory::InMemoryStore;
pub use websocket::InMemoryConnectionHub;
