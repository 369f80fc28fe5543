//! Repository接口定义
//!
//! 持久化网关的抽象接口：内层定义接口，外层实现接口。
//! 中继核心只使用 `UserRepository::find_by_id` 做消息富化。

pub mod conversation_repository;
pub mod message_repository;
pub mod user_repository;

// 重新导出所有Repository特征
pub use conversation_repository::ConversationRepository;
pub use message_repository::MessageRepository;
pub use user_repository::UserRepository;

#[cfg(feature = "testing")]
pub use conversation_repository::MockConversationRepository;
#[cfg(feature = "testing")]
pub use message_repository::MockMessageRepository;
#[cfg(feature = "testing")]
pub use user_repository::MockUserRepository;
