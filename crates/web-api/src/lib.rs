//! Web API 层。
//!
//! 提供 Axum 路由：`/ws` 接入中继核心，`/api/*` 委托给应用层的会话与用户服务。

mod error;
mod routes;
mod state;
mod websocket;

pub use error::{ApiError, ErrorBody};
pub use routes::router;
pub use state::{AppState, SocketSettings};
