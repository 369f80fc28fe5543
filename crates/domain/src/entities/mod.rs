//! 领域实体定义
//!
//! 包含中继协议、用户资料、会话和消息。

pub mod conversation;
pub mod message;
pub mod user;
pub mod websocket;

// 重新导出核心实体
pub use conversation::{never_seen, Conversation, SeenMarker, LAST_MESSAGE_PREVIEW_CHARS};
pub use message::ChatMessage;
pub use user::UserProfile;
pub use websocket::*;
