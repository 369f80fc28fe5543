//! 身份注册表
//!
//! 维护 身份 → 当前连接 的映射。同一个类型按命名空间实例化三次
//! （主命名空间、次命名空间、兼容命名空间），三者互不合并。

use std::collections::HashMap;

use domain::{ConnectionId, Identity, Namespace, Timestamp};
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// 注册结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// 新身份
    Inserted,
    /// 身份迁移到了新连接，旧连接对该身份失效
    Replaced { previous: ConnectionId },
    /// 身份已绑定在同一连接上
    Unchanged,
}

impl Registration {
    pub fn changed(&self) -> bool {
        !matches!(self, Registration::Unchanged)
    }
}

/// 快照中的一项
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryEntry {
    pub identity: Identity,
    pub connection_id: ConnectionId,
    pub registered_at: Timestamp,
}

#[derive(Debug, Clone)]
struct Binding {
    connection_id: ConnectionId,
    order: u64,
    registered_at: Timestamp,
}

#[derive(Debug, Default)]
struct RegistryState {
    entries: HashMap<Identity, Binding>,
    /// 连接注册过的身份，按注册先后排列
    by_connection: HashMap<ConnectionId, Vec<Identity>>,
    next_order: u64,
}

impl RegistryState {
    fn detach(&mut self, connection_id: ConnectionId, identity: &Identity) {
        if let Some(identities) = self.by_connection.get_mut(&connection_id) {
            identities.retain(|i| i != identity);
            if identities.is_empty() {
                self.by_connection.remove(&connection_id);
            }
        }
    }
}

/// 单个命名空间的身份注册表
#[derive(Debug)]
pub struct IdentityRegistry {
    namespace: Namespace,
    state: RwLock<RegistryState>,
}

impl IdentityRegistry {
    pub fn new(namespace: Namespace) -> Self {
        Self {
            namespace,
            state: RwLock::new(RegistryState::default()),
        }
    }

    pub fn namespace(&self) -> Namespace {
        self.namespace
    }

    /// 绑定身份到连接（后写者胜出）
    ///
    /// 被替换的旧连接不会收到任何通知；身份保留其首次注册时的排序位置。
    pub async fn register(&self, identity: Identity, connection_id: ConnectionId) -> Registration {
        let mut state = self.state.write().await;

        let previous = state
            .entries
            .get(&identity)
            .map(|binding| binding.connection_id);

        let outcome = match previous {
            Some(previous) if previous == connection_id => Registration::Unchanged,
            Some(previous) => {
                state.detach(previous, &identity);
                if let Some(binding) = state.entries.get_mut(&identity) {
                    binding.connection_id = connection_id;
                    binding.registered_at = Utc::now();
                }
                Registration::Replaced { previous }
            }
            None => {
                let order = state.next_order;
                state.next_order += 1;
                state.entries.insert(
                    identity.clone(),
                    Binding {
                        connection_id,
                        order,
                        registered_at: Utc::now(),
                    },
                );
                Registration::Inserted
            }
        };

        if outcome.changed() {
            let identities = state.by_connection.entry(connection_id).or_default();
            identities.retain(|i| i != &identity);
            identities.push(identity.clone());
        }

        match outcome {
            Registration::Inserted => info!(
                namespace = %self.namespace,
                identity = %identity,
                connection_id = %connection_id,
                "身份已注册"
            ),
            Registration::Replaced { previous } => info!(
                namespace = %self.namespace,
                identity = %identity,
                connection_id = %connection_id,
                previous = %previous,
                "身份迁移到新连接"
            ),
            Registration::Unchanged => debug!(
                namespace = %self.namespace,
                identity = %identity,
                "重复注册，忽略"
            ),
        }

        outcome
    }

    /// 查找身份当前绑定的连接，不存在表示离线
    pub async fn lookup(&self, identity: &Identity) -> Option<ConnectionId> {
        let state = self.state.read().await;
        state.entries.get(identity).map(|binding| binding.connection_id)
    }

    /// 移除当前绑定在该连接上的所有身份
    ///
    /// 已经迁移到其他连接的身份不受影响。
    pub async fn unregister_by_handle(&self, connection_id: ConnectionId) -> Vec<Identity> {
        let mut state = self.state.write().await;
        let Some(identities) = state.by_connection.remove(&connection_id) else {
            return Vec::new();
        };

        let mut removed = Vec::with_capacity(identities.len());
        for identity in identities {
            let current = state
                .entries
                .get(&identity)
                .map(|binding| binding.connection_id);
            if current == Some(connection_id) {
                state.entries.remove(&identity);
                removed.push(identity);
            }
        }

        if !removed.is_empty() {
            info!(
                namespace = %self.namespace,
                connection_id = %connection_id,
                removed = removed.len(),
                "连接的身份已注销"
            );
        }

        removed
    }

    /// 该连接在本命名空间最近一次注册的身份
    pub async fn identity_of(&self, connection_id: ConnectionId) -> Option<Identity> {
        let state = self.state.read().await;
        state
            .by_connection
            .get(&connection_id)
            .and_then(|identities| identities.last().cloned())
    }

    /// 按首次注册顺序排列的全部条目
    pub async fn snapshot(&self) -> Vec<RegistryEntry> {
        let state = self.state.read().await;
        let mut bindings: Vec<(&Identity, &Binding)> = state.entries.iter().collect();
        bindings.sort_by_key(|(_, binding)| binding.order);
        bindings
            .into_iter()
            .map(|(identity, binding)| RegistryEntry {
                identity: identity.clone(),
                connection_id: binding.connection_id,
                registered_at: binding.registered_at,
            })
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.read().await.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(value: &str) -> Identity {
        Identity::parse(value).unwrap()
    }

    #[tokio::test]
    async fn test_register_and_lookup() {
        let registry = IdentityRegistry::new(Namespace::Primary);
        let conn = ConnectionId::new();

        assert_eq!(registry.register(id("alice"), conn).await, Registration::Inserted);
        assert_eq!(registry.lookup(&id("alice")).await, Some(conn));
        assert_eq!(registry.lookup(&id("bob")).await, None);
    }

    #[tokio::test]
    async fn test_register_is_idempotent() {
        let registry = IdentityRegistry::new(Namespace::Primary);
        let conn = ConnectionId::new();

        registry.register(id("alice"), conn).await;
        assert_eq!(registry.register(id("alice"), conn).await, Registration::Unchanged);
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_reconnection_replaces_handle() {
        let registry = IdentityRegistry::new(Namespace::Primary);
        let old = ConnectionId::new();
        let new = ConnectionId::new();

        registry.register(id("alice"), old).await;
        let outcome = registry.register(id("alice"), new).await;

        assert_eq!(outcome, Registration::Replaced { previous: old });
        assert_eq!(registry.lookup(&id("alice")).await, Some(new));
        assert_eq!(registry.len().await, 1);
        assert_eq!(registry.identity_of(old).await, None);
    }

    #[tokio::test]
    async fn test_stale_disconnect_keeps_new_entry() {
        let registry = IdentityRegistry::new(Namespace::Secondary);
        let old = ConnectionId::new();
        let new = ConnectionId::new();

        registry.register(id("phone-a"), old).await;
        registry.register(id("phone-a"), new).await;

        let removed = registry.unregister_by_handle(old).await;
        assert!(removed.is_empty());
        assert_eq!(registry.lookup(&id("phone-a")).await, Some(new));

        let removed = registry.unregister_by_handle(new).await;
        assert_eq!(removed, vec![id("phone-a")]);
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_snapshot_keeps_first_registration_order() {
        let registry = IdentityRegistry::new(Namespace::Primary);
        let a1 = ConnectionId::new();
        let b = ConnectionId::new();
        let a2 = ConnectionId::new();

        registry.register(id("alice"), a1).await;
        registry.register(id("bob"), b).await;
        registry.register(id("alice"), a2).await;

        let snapshot = registry.snapshot().await;
        let order: Vec<_> = snapshot.iter().map(|e| e.identity.as_str()).collect();
        assert_eq!(order, vec!["alice", "bob"]);
        assert_eq!(snapshot[0].connection_id, a2);
    }

    #[tokio::test]
    async fn test_identity_of_returns_latest_registration() {
        let registry = IdentityRegistry::new(Namespace::Secondary);
        let conn = ConnectionId::new();

        registry.register(id("phone-a"), conn).await;
        registry.register(id("phone-b"), conn).await;

        assert_eq!(registry.identity_of(conn).await, Some(id("phone-b")));

        let mut removed = registry.unregister_by_handle(conn).await;
        removed.sort();
        assert_eq!(removed, vec![id("phone-a"), id("phone-b")]);
    }
}
