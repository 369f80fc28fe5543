//! 应用层实现。
//!
//! 中继核心（身份注册表、在线目录、房间表、信令路由、聊天转发）以及
//! 围绕持久化网关的 REST 用例服务。传输层通过领域层定义的
//! `ConnectionManager` / `MessageRouter` 接口接入。

pub mod chat_relay;
pub mod clock;
pub mod delivery;
pub mod dto;
pub mod error;
pub mod heartbeat;
pub mod hub;
pub mod presence;
pub mod registry;
pub mod rooms;
pub mod services;
pub mod signaling;

#[cfg(test)]
pub(crate) mod test_support;

pub use chat_relay::ChatRelay;
pub use clock::{Clock, SystemClock};
pub use delivery::{Delivery, DropReason};
pub use error::ApplicationError;
pub use heartbeat::{EvictionPolicy, LivenessSweeper};
pub use hub::{DisconnectSummary, RelayHub, RelayHubDependencies};
pub use presence::PresenceDirectory;
pub use registry::{IdentityRegistry, Registration, RegistryEntry};
pub use rooms::{RoomState, RoomTable};
pub use services::{
    ConversationService, ConversationServiceDependencies, UserService, UserServiceDependencies,
    NEW_CONVERSATION_PLACEHOLDER,
};
pub use signaling::{Resolution, SignalKind, SignalingRouter};
