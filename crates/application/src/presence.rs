//! 在线目录
//!
//! 从注册表推导在线名单，并在成员变化时完整广播给所有连接。

use std::sync::Arc;

use domain::{CompatPeer, CompatRoster, MessageRouter, PresenceEntry, ServerEvent};
use tracing::{debug, warn};

use crate::delivery::Delivery;
use crate::registry::IdentityRegistry;

pub struct PresenceDirectory {
    primary: Arc<IdentityRegistry>,
    compat: Arc<IdentityRegistry>,
    router: Arc<dyn MessageRouter>,
}

impl PresenceDirectory {
    pub fn new(
        primary: Arc<IdentityRegistry>,
        compat: Arc<IdentityRegistry>,
        router: Arc<dyn MessageRouter>,
    ) -> Self {
        Self {
            primary,
            compat,
            router,
        }
    }

    /// 主命名空间的当前在线快照
    pub async fn snapshot(&self) -> Vec<PresenceEntry> {
        self.primary
            .snapshot()
            .await
            .into_iter()
            .map(|entry| PresenceEntry {
                id: entry.identity,
                socket_id: entry.connection_id,
            })
            .collect()
    }

    /// 兼容命名空间的名单，按加入顺序排列
    pub async fn compat_roster(&self) -> CompatRoster {
        self.compat
            .snapshot()
            .await
            .into_iter()
            .map(|entry| CompatPeer {
                username: entry.identity,
                id: entry.connection_id,
            })
            .collect()
    }

    /// 广播 `getUsers`
    pub async fn broadcast(&self) -> Delivery {
        let snapshot = self.snapshot().await;
        let size = snapshot.len();
        let delivery = self.fan_out(ServerEvent::Users(snapshot)).await;
        debug!(online = size, ?delivery, "在线快照已广播");
        delivery
    }

    /// 广播兼容名单 `joined`
    pub async fn broadcast_compat(&self) -> Delivery {
        let roster = self.compat_roster().await;
        self.fan_out(ServerEvent::Joined(roster)).await
    }

    async fn fan_out(&self, event: ServerEvent) -> Delivery {
        let name = event.name();
        match self.router.broadcast(event).await {
            Ok(count) => Delivery::Fanout(count),
            Err(e) => {
                warn!(event = name, error = %e, "广播失败");
                Delivery::Fanout(0)
            }
        }
    }
}
