//! 在线状态与信令中继的领域模型
//!
//! 包含身份、连接句柄、线上协议、会话与消息实体，以及持久化网关和出站路由的接口。

pub mod entities;
pub mod errors;
pub mod repositories;
pub mod services;
pub mod value_objects;

// 重新导出常用类型
pub use entities::*;
pub use errors::*;
pub use repositories::*;
pub use services::*;
pub use value_objects::*;
