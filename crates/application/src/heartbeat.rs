//! 连接存活检测
//!
//! 启用时定期扫描超时未活跃的连接并关闭它们；未启用时身份一直保留，
//! 直到传输层自行断开。

use std::sync::Arc;
use std::time::Duration;

use domain::ConnectionId;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::hub::RelayHub;

/// 驱逐策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvictionPolicy {
    pub enabled: bool,
    /// 扫描间隔，同时也是服务器发送 Ping 的间隔
    pub interval: Duration,
    /// 超过该时长没有任何入站帧的连接被关闭
    pub timeout: Duration,
}

impl EvictionPolicy {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }
}

impl Default for EvictionPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: Duration::from_secs(30),
            timeout: Duration::from_secs(90),
        }
    }
}

pub struct LivenessSweeper {
    hub: Arc<RelayHub>,
    policy: EvictionPolicy,
}

impl LivenessSweeper {
    pub fn new(hub: Arc<RelayHub>, policy: EvictionPolicy) -> Self {
        Self { hub, policy }
    }

    pub fn policy(&self) -> EvictionPolicy {
        self.policy
    }

    /// 执行一次扫描，返回被驱逐的连接
    pub async fn sweep_once(&self) -> Vec<ConnectionId> {
        let idle = self.hub.idle_connections(self.policy.timeout).await;
        let mut evicted = Vec::with_capacity(idle.len());

        for connection_id in idle {
            if let Some(summary) = self.hub.close(connection_id).await {
                warn!(
                    connection_id = %connection_id,
                    identities = summary.primary.len() + summary.secondary.len() + summary.compat.len(),
                    "连接超时未活跃，已驱逐"
                );
                evicted.push(connection_id);
            }
        }

        evicted
    }

    /// 在后台周期性扫描。策略未启用时不启动任务
    pub fn spawn(self) -> Option<JoinHandle<()>> {
        if !self.policy.enabled {
            info!("存活检测已关闭，身份将一直保留到传输断开");
            return None;
        }

        info!(
            interval_secs = self.policy.interval.as_secs(),
            timeout_secs = self.policy.timeout.as_secs(),
            "启动存活检测"
        );

        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.policy.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                self.sweep_once().await;
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::RelayHubDependencies;
    use crate::test_support::RecordingRouter;
    use domain::{ClientEvent, Identity, MockUserRepository, Namespace};
    use tokio::sync::mpsc;

    fn setup() -> (Arc<RelayHub>, Arc<RecordingRouter>) {
        let router = Arc::new(RecordingRouter::new());
        let hub = Arc::new(RelayHub::new(RelayHubDependencies {
            connections: router.clone(),
            router: router.clone(),
            users: Arc::new(MockUserRepository::new()),
        }));
        (hub, router)
    }

    #[tokio::test]
    async fn test_sweep_evicts_idle_connection() {
        let (hub, router) = setup();
        let (tx, _rx) = mpsc::unbounded_channel();
        let a = ConnectionId::new();
        hub.connect(a, tx).await;
        hub.dispatch(a, ClientEvent::JoinUser(Identity::parse("user-a").unwrap()))
            .await;

        router.mark_idle(a);
        let sweeper = LivenessSweeper::new(hub.clone(), EvictionPolicy::default());

        assert_eq!(sweeper.sweep_once().await, vec![a]);
        assert!(hub.registry(Namespace::Primary).is_empty().await);
        assert!(sweeper.sweep_once().await.is_empty());
    }

    #[tokio::test]
    async fn test_disabled_policy_does_not_spawn() {
        let (hub, _router) = setup();
        let sweeper = LivenessSweeper::new(hub, EvictionPolicy::disabled());
        assert!(sweeper.spawn().is_none());
    }
}
