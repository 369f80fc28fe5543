//! WebSocket服务接口
//!
//! 定义连接管理与出站消息路由的核心接口。中继核心只通过这两个接口
//! 接触传输层，便于在测试中替换。

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::entities::websocket::ServerEvent;
use crate::errors::RelayError;
use crate::value_objects::ConnectionId;

/// 每个连接的出站通道。无界通道保证慢速接收方不会阻塞发送方。
pub type OutboundSender = mpsc::UnboundedSender<ServerEvent>;

/// WebSocket连接管理器接口
#[async_trait]
pub trait ConnectionManager: Send + Sync {
    /// 注册新连接及其出站通道
    async fn register_connection(&self, connection_id: ConnectionId, sender: OutboundSender);

    /// 注销连接，丢弃出站通道。返回连接此前是否存在
    async fn unregister_connection(&self, connection_id: ConnectionId) -> bool;

    /// 更新连接活跃时间
    async fn update_connection_activity(
        &self,
        connection_id: ConnectionId,
    ) -> Result<(), RelayError>;

    /// 超过 `timeout` 没有任何入站帧的连接
    async fn idle_connections(&self, timeout: Duration) -> Vec<ConnectionId>;

    /// 连接是否仍然存活
    async fn is_connected(&self, connection_id: ConnectionId) -> bool;

    /// 获取连接统计信息
    async fn get_stats(&self) -> ConnectionStats;
}

/// WebSocket消息路由器接口
///
/// 所有投递都是“发出即忘”：只把事件放入目标连接的出站通道。
#[async_trait]
pub trait MessageRouter: Send + Sync {
    /// 路由消息到指定连接
    async fn route_to_connection(
        &self,
        connection_id: ConnectionId,
        event: ServerEvent,
    ) -> Result<(), RelayError>;

    /// 路由消息到多个连接，返回成功投递的数量
    async fn route_to_connections(
        &self,
        connection_ids: &[ConnectionId],
        event: ServerEvent,
    ) -> Result<usize, RelayError>;

    /// 广播消息到所有连接，返回成功投递的数量
    async fn broadcast(&self, event: ServerEvent) -> Result<usize, RelayError>;

    /// 获取路由统计信息
    async fn get_stats(&self) -> RouterStats;
}

/// 连接统计信息
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConnectionStats {
    /// 累计连接数
    pub total_connections: u64,
    /// 当前活跃连接数
    pub active_connections: usize,
    /// 峰值连接数
    pub peak_connections: usize,
}

/// 路由统计信息
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouterStats {
    /// 总消息数
    pub total_messages: u64,
    /// 成功路由数
    pub successful_routes: u64,
    /// 失败路由数
    pub failed_routes: u64,
}
