//! 单元测试用的内存路由器，记录每个连接收到的事件

use std::collections::BTreeSet;
use std::sync::Mutex;

use async_trait::async_trait;
use domain::{
    ConnectionId, ConnectionManager, ConnectionStats, MessageRouter, OutboundSender, RelayError,
    RouterStats, ServerEvent,
};

#[derive(Default)]
pub struct RecordingRouter {
    connected: Mutex<Vec<ConnectionId>>,
    closed: Mutex<BTreeSet<uuid::Uuid>>,
    idle: Mutex<Vec<ConnectionId>>,
    delivered: Mutex<Vec<(ConnectionId, ServerEvent)>>,
}

impl RecordingRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connect(&self) -> ConnectionId {
        let id = ConnectionId::new();
        self.connected.lock().unwrap().push(id);
        id
    }

    pub fn close(&self, id: ConnectionId) {
        self.closed.lock().unwrap().insert(id.0);
    }

    pub fn mark_idle(&self, id: ConnectionId) {
        self.idle.lock().unwrap().push(id);
    }

    pub fn events_for(&self, id: ConnectionId) -> Vec<ServerEvent> {
        self.delivered
            .lock()
            .unwrap()
            .iter()
            .filter(|(target, _)| *target == id)
            .map(|(_, event)| event.clone())
            .collect()
    }

    pub fn named_for(&self, id: ConnectionId, name: &str) -> Vec<ServerEvent> {
        self.events_for(id)
            .into_iter()
            .filter(|event| event.name() == name)
            .collect()
    }

    pub fn total(&self) -> usize {
        self.delivered.lock().unwrap().len()
    }

    pub fn clear(&self) {
        self.delivered.lock().unwrap().clear();
    }

    fn push(&self, id: ConnectionId, event: ServerEvent) -> Result<(), RelayError> {
        let open = self.connected.lock().unwrap().contains(&id)
            && !self.closed.lock().unwrap().contains(&id.0);
        if !open {
            return Err(RelayError::ConnectionClosed(id));
        }
        self.delivered.lock().unwrap().push((id, event));
        Ok(())
    }
}

#[async_trait]
impl MessageRouter for RecordingRouter {
    async fn route_to_connection(
        &self,
        connection_id: ConnectionId,
        event: ServerEvent,
    ) -> Result<(), RelayError> {
        self.push(connection_id, event)
    }

    async fn route_to_connections(
        &self,
        connection_ids: &[ConnectionId],
        event: ServerEvent,
    ) -> Result<usize, RelayError> {
        Ok(connection_ids
            .iter()
            .filter(|id| self.push(**id, event.clone()).is_ok())
            .count())
    }

    async fn broadcast(&self, event: ServerEvent) -> Result<usize, RelayError> {
        let targets = self.connected.lock().unwrap().clone();
        self.route_to_connections(&targets, event).await
    }

    async fn get_stats(&self) -> RouterStats {
        RouterStats::default()
    }
}

#[async_trait]
impl ConnectionManager for RecordingRouter {
    async fn register_connection(&self, connection_id: ConnectionId, _sender: OutboundSender) {
        self.connected.lock().unwrap().push(connection_id);
    }

    async fn unregister_connection(&self, connection_id: ConnectionId) -> bool {
        let mut connected = self.connected.lock().unwrap();
        let before = connected.len();
        connected.retain(|id| *id != connection_id);
        self.idle.lock().unwrap().retain(|id| *id != connection_id);
        connected.len() != before
    }

    async fn update_connection_activity(
        &self,
        connection_id: ConnectionId,
    ) -> Result<(), RelayError> {
        if !self.connected.lock().unwrap().contains(&connection_id) {
            return Err(RelayError::ConnectionClosed(connection_id));
        }
        self.idle.lock().unwrap().retain(|id| *id != connection_id);
        Ok(())
    }

    async fn idle_connections(&self, _timeout: std::time::Duration) -> Vec<ConnectionId> {
        self.idle.lock().unwrap().clone()
    }

    async fn is_connected(&self, connection_id: ConnectionId) -> bool {
        self.connected.lock().unwrap().contains(&connection_id)
    }

    async fn get_stats(&self) -> ConnectionStats {
        let active = self.connected.lock().unwrap().len();
        ConnectionStats {
            total_connections: active as u64,
            active_connections: active,
            peak_connections: active,
        }
    }
}
