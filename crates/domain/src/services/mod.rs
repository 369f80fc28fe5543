//! 领域服务定义
//!
//! 传输层相关的端口接口。

pub mod websocket_service;

// 重新导出服务
pub use websocket_service::*;
