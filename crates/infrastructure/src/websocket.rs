//! WebSocket连接基础设施实现
//!
//! 内存中的连接表：每个连接持有一个出站通道和最后活跃时间，
//! 同时实现连接管理与消息路由两个接口。

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::{
    ConnectionId, ConnectionManager, ConnectionStats, MessageRouter, OutboundSender, RelayError,
    RouterStats, ServerEvent,
};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// 单个连接的状态
struct ConnectionEntry {
    sender: OutboundSender,
    connected_at: DateTime<Utc>,
    last_active: DateTime<Utc>,
}

/// 内存中的连接中枢
#[derive(Clone, Default)]
pub struct InMemoryConnectionHub {
    /// 连接存储
    connections: Arc<RwLock<HashMap<ConnectionId, ConnectionEntry>>>,
    /// 连接统计
    connection_stats: Arc<RwLock<ConnectionStats>>,
    /// 路由统计
    router_stats: Arc<RwLock<RouterStats>>,
}

impl InMemoryConnectionHub {
    /// 创建新的内存连接中枢
    pub fn new() -> Self {
        Self::default()
    }

    /// 更新连接统计信息
    async fn update_connection_stats(&self, f: impl FnOnce(&mut ConnectionStats)) {
        let mut stats = self.connection_stats.write().await;
        f(&mut stats);
    }

    /// 更新路由统计信息
    async fn update_router_stats(&self, f: impl FnOnce(&mut RouterStats)) {
        let mut stats = self.router_stats.write().await;
        f(&mut stats);
    }

    /// 连接建立时间
    pub async fn connected_at(&self, connection_id: ConnectionId) -> Option<DateTime<Utc>> {
        let connections = self.connections.read().await;
        connections.get(&connection_id).map(|entry| entry.connected_at)
    }

    /// 发送到单个连接，不更新统计
    async fn send_to_connection(
        &self,
        connection_id: ConnectionId,
        event: ServerEvent,
    ) -> Result<(), RelayError> {
        let connections = self.connections.read().await;
        let entry = connections
            .get(&connection_id)
            .ok_or(RelayError::ConnectionClosed(connection_id))?;

        entry
            .sender
            .send(event)
            .map_err(|_| RelayError::SendFailed(connection_id))
    }
}

#[async_trait]
impl ConnectionManager for InMemoryConnectionHub {
    async fn register_connection(&self, connection_id: ConnectionId, sender: OutboundSender) {
        let now = Utc::now();
        let replaced = {
            let mut connections = self.connections.write().await;
            connections
                .insert(
                    connection_id,
                    ConnectionEntry {
                        sender,
                        connected_at: now,
                        last_active: now,
                    },
                )
                .is_some()
        };

        if !replaced {
            self.update_connection_stats(|stats| {
                stats.total_connections += 1;
                stats.active_connections += 1;
                stats.peak_connections = stats.peak_connections.max(stats.active_connections);
            })
            .await;
        }

        info!(connection_id = %connection_id, "Connection registered");
    }

    async fn unregister_connection(&self, connection_id: ConnectionId) -> bool {
        let removed = {
            let mut connections = self.connections.write().await;
            connections.remove(&connection_id).is_some()
        };

        if removed {
            self.update_connection_stats(|stats| {
                stats.active_connections = stats.active_connections.saturating_sub(1);
            })
            .await;
            info!(connection_id = %connection_id, "Connection unregistered");
        }

        removed
    }

    async fn update_connection_activity(
        &self,
        connection_id: ConnectionId,
    ) -> Result<(), RelayError> {
        let mut connections = self.connections.write().await;
        let entry = connections
            .get_mut(&connection_id)
            .ok_or(RelayError::ConnectionClosed(connection_id))?;

        entry.last_active = Utc::now();
        debug!(connection_id = %connection_id, "Connection activity updated");
        Ok(())
    }

    async fn idle_connections(&self, timeout: Duration) -> Vec<ConnectionId> {
        let now = Utc::now();
        let timeout = chrono::Duration::from_std(timeout).unwrap_or(chrono::Duration::MAX);

        let connections = self.connections.read().await;
        connections
            .iter()
            .filter(|(_, entry)| now.signed_duration_since(entry.last_active) > timeout)
            .map(|(id, _)| *id)
            .collect()
    }

    async fn is_connected(&self, connection_id: ConnectionId) -> bool {
        self.connections.read().await.contains_key(&connection_id)
    }

    async fn get_stats(&self) -> ConnectionStats {
        self.connection_stats.read().await.clone()
    }
}

#[async_trait]
impl MessageRouter for InMemoryConnectionHub {
    async fn route_to_connection(
        &self,
        connection_id: ConnectionId,
        event: ServerEvent,
    ) -> Result<(), RelayError> {
        let name = event.name();
        match self.send_to_connection(connection_id, event).await {
            Ok(()) => {
                self.update_router_stats(|stats| {
                    stats.total_messages += 1;
                    stats.successful_routes += 1;
                })
                .await;
                debug!(connection_id = %connection_id, event = name, "Event routed to connection");
                Ok(())
            }
            Err(e) => {
                self.update_router_stats(|stats| {
                    stats.total_messages += 1;
                    stats.failed_routes += 1;
                })
                .await;
                warn!(connection_id = %connection_id, event = name, error = %e, "Failed to route event");
                Err(e)
            }
        }
    }

    async fn route_to_connections(
        &self,
        connection_ids: &[ConnectionId],
        event: ServerEvent,
    ) -> Result<usize, RelayError> {
        let (delivered, failed) = {
            let connections = self.connections.read().await;
            let mut delivered = 0usize;
            let mut failed = 0usize;

            for connection_id in connection_ids {
                match connections.get(connection_id) {
                    Some(entry) if entry.sender.send(event.clone()).is_ok() => delivered += 1,
                    _ => {
                        failed += 1;
                        warn!(connection_id = %connection_id, "Failed to route to connection");
                    }
                }
            }
            (delivered, failed)
        };

        self.update_router_stats(|stats| {
            stats.total_messages += 1;
            stats.successful_routes += delivered as u64;
            stats.failed_routes += failed as u64;
        })
        .await;

        Ok(delivered)
    }

    async fn broadcast(&self, event: ServerEvent) -> Result<usize, RelayError> {
        let (delivered, failed) = {
            let connections = self.connections.read().await;
            let mut delivered = 0usize;
            let mut failed = 0usize;

            for (connection_id, entry) in connections.iter() {
                if entry.sender.send(event.clone()).is_ok() {
                    delivered += 1;
                } else {
                    failed += 1;
                    warn!(connection_id = %connection_id, "Failed to broadcast to connection");
                }
            }
            (delivered, failed)
        };

        if failed > 0 {
            warn!(failed, event = event.name(), "Broadcast failed for some connections");
        }

        self.update_router_stats(|stats| {
            stats.total_messages += 1;
            stats.successful_routes += delivered as u64;
            stats.failed_routes += failed as u64;
        })
        .await;

        Ok(delivered)
    }

    async fn get_stats(&self) -> RouterStats {
        self.router_stats.read().await.clone()
    }
}
