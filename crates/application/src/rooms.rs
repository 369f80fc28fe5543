//! 通话房间表
//!
//! 房间只在建立通话时使用：房间ID → 已加入的连接集合。
//! 逻辑上容纳两方，但不强制上限。

use std::collections::HashMap;

use domain::{ConnectionId, RoomId};
use tokio::sync::RwLock;
use tracing::debug;

/// 房间状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomState {
    Empty,
    /// 只有一个成员在等待
    Joining,
    /// 两个及以上成员
    Paired,
}

impl RoomState {
    fn from_members(count: usize) -> Self {
        match count {
            0 => RoomState::Empty,
            1 => RoomState::Joining,
            _ => RoomState::Paired,
        }
    }
}

#[derive(Debug, Default)]
pub struct RoomTable {
    /// 成员按加入先后排列
    rooms: RwLock<HashMap<RoomId, Vec<ConnectionId>>>,
}

impl RoomTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// 把连接加入房间，返回加入前已在房间内的其他成员
    ///
    /// 同一连接重复加入不会产生重复成员。
    pub async fn join(&self, room_id: &RoomId, connection_id: ConnectionId) -> Vec<ConnectionId> {
        let mut rooms = self.rooms.write().await;
        let members = rooms.entry(room_id.clone()).or_default();

        let others: Vec<ConnectionId> = members
            .iter()
            .copied()
            .filter(|member| *member != connection_id)
            .collect();

        if !members.contains(&connection_id) {
            members.push(connection_id);
        }

        debug!(
            room_id = %room_id,
            connection_id = %connection_id,
            members = members.len(),
            "连接加入房间"
        );

        others
    }

    pub async fn members(&self, room_id: &RoomId) -> Vec<ConnectionId> {
        let rooms = self.rooms.read().await;
        rooms.get(room_id).cloned().unwrap_or_default()
    }

    pub async fn state(&self, room_id: &RoomId) -> RoomState {
        let rooms = self.rooms.read().await;
        RoomState::from_members(rooms.get(room_id).map_or(0, Vec::len))
    }

    /// 连接离开所有房间，没有成员的房间被删除。返回它离开的房间
    pub async fn leave_all(&self, connection_id: ConnectionId) -> Vec<RoomId> {
        let mut rooms = self.rooms.write().await;
        let mut left = Vec::new();

        rooms.retain(|room_id, members| {
            let before = members.len();
            members.retain(|member| *member != connection_id);
            if members.len() != before {
                left.push(room_id.clone());
            }
            !members.is_empty()
        });

        left
    }

    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }
}
