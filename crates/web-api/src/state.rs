use std::sync::Arc;
use std::time::Duration;

use application::{ConversationService, RelayHub, UserService};
use config::{HeartbeatConfig, WebSocketConfig};

/// WebSocket 连接参数
#[derive(Debug, Clone, Copy)]
pub struct SocketSettings {
    /// 单帧最大字节数
    pub max_message_size: usize,
    /// 服务器发送 Ping 的间隔，`None` 表示不发送
    pub ping_interval: Option<Duration>,
}

impl SocketSettings {
    pub fn from_config(websocket: &WebSocketConfig, heartbeat: &HeartbeatConfig) -> Self {
        Self {
            max_message_size: websocket.max_message_size,
            ping_interval: heartbeat.enabled.then(|| heartbeat.interval()),
        }
    }
}

impl Default for SocketSettings {
    fn default() -> Self {
        Self {
            max_message_size: 64 * 1024,
            ping_interval: None,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub hub: Arc<RelayHub>,
    pub conversation_service: Arc<ConversationService>,
    pub user_service: Arc<UserService>,
    pub socket: SocketSettings,
}

impl AppState {
    pub fn new(
        hub: Arc<RelayHub>,
        conversation_service: Arc<ConversationService>,
        user_service: Arc<UserService>,
        socket: SocketSettings,
    ) -> Self {
        Self {
            hub,
            conversation_service,
            user_service,
            socket,
        }
    }
}
