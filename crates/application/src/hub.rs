//! 中继中枢
//!
//! 持有三个身份注册表、房间表以及各个转发组件，
//! 负责把解码后的入站事件分派到对应组件，并在连接关闭时统一清理。

use std::sync::Arc;
use std::time::Duration;

use domain::{
    ClientEvent, ConnectionId, ConnectionManager, Identity, MessageRouter, Namespace,
    OutboundSender, PresenceEntry, RoomId, UserRepository,
};
use tracing::{debug, info};

use crate::chat_relay::ChatRelay;
use crate::delivery::{Delivery, DropReason};
use crate::presence::PresenceDirectory;
use crate::registry::IdentityRegistry;
use crate::rooms::RoomTable;
use crate::signaling::SignalingRouter;

pub struct RelayHubDependencies {
    pub connections: Arc<dyn ConnectionManager>,
    pub router: Arc<dyn MessageRouter>,
    pub users: Arc<dyn UserRepository>,
}

/// 一次断开清理的结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisconnectSummary {
    pub primary: Vec<Identity>,
    pub secondary: Vec<Identity>,
    pub compat: Vec<Identity>,
    pub rooms: Vec<RoomId>,
}

pub struct RelayHub {
    connections: Arc<dyn ConnectionManager>,
    primary: Arc<IdentityRegistry>,
    secondary: Arc<IdentityRegistry>,
    compat: Arc<IdentityRegistry>,
    rooms: Arc<RoomTable>,
    presence: PresenceDirectory,
    signaling: SignalingRouter,
    chat: ChatRelay,
}

impl RelayHub {
    pub fn new(deps: RelayHubDependencies) -> Self {
        let RelayHubDependencies {
            connections,
            router,
            users,
        } = deps;

        let primary = Arc::new(IdentityRegistry::new(Namespace::Primary));
        let secondary = Arc::new(IdentityRegistry::new(Namespace::Secondary));
        let compat = Arc::new(IdentityRegistry::new(Namespace::Compat));
        let rooms = Arc::new(RoomTable::new());

        let presence = PresenceDirectory::new(primary.clone(), compat.clone(), router.clone());
        let signaling = SignalingRouter::new(
            primary.clone(),
            secondary.clone(),
            compat.clone(),
            rooms.clone(),
            router.clone(),
        );
        let chat = ChatRelay::new(primary.clone(), users, router);

        Self {
            connections,
            primary,
            secondary,
            compat,
            rooms,
            presence,
            signaling,
            chat,
        }
    }

    /// 传输建立后登记连接及其出站通道
    pub async fn connect(&self, connection_id: ConnectionId, sender: OutboundSender) {
        self.connections
            .register_connection(connection_id, sender)
            .await;
    }

    /// 任何入站帧都刷新连接活跃时间。连接已被关闭时返回 `false`，
    /// 调用方应停止读取该连接
    pub async fn touch(&self, connection_id: ConnectionId) -> bool {
        match self
            .connections
            .update_connection_activity(connection_id)
            .await
        {
            Ok(()) => true,
            Err(e) => {
                debug!(connection_id = %connection_id, error = %e, "刷新活跃时间失败");
                false
            }
        }
    }

    /// 分派一个入站事件，事件按连接内的接收顺序逐个处理
    ///
    /// 已关闭连接上的事件会被丢弃。注册类事件完成后再次检查连接，
    /// 若期间连接被关闭则撤销这次注册。
    pub async fn dispatch(&self, origin: ConnectionId, event: ClientEvent) -> Delivery {
        debug!(connection_id = %origin, event = event.name(), "处理入站事件");

        if !self.connections.is_connected(origin).await {
            debug!(connection_id = %origin, event = event.name(), "连接已关闭，丢弃事件");
            return Delivery::Dropped(DropReason::OriginClosed);
        }

        let registers = matches!(
            event,
            ClientEvent::JoinUser(_) | ClientEvent::JoinUserByName(_) | ClientEvent::JoinRoom(_)
        );
        let delivery = self.route(origin, event).await;

        if registers && !self.connections.is_connected(origin).await {
            info!(connection_id = %origin, "注册期间连接已关闭，撤销注册");
            self.disconnect(origin).await;
            return Delivery::Dropped(DropReason::OriginClosed);
        }

        delivery
    }

    async fn route(&self, origin: ConnectionId, event: ClientEvent) -> Delivery {
        match event {
            ClientEvent::JoinUser(identity) => {
                self.primary.register(identity, origin).await;
                self.presence.broadcast().await
            }
            ClientEvent::JoinUserByName(username) => {
                self.compat.register(username, origin).await;
                self.presence.broadcast_compat().await
            }
            ClientEvent::SendMessage(payload) => self.chat.send_message(origin, payload).await,
            ClientEvent::RequestingVideoCall(payload) => {
                self.signaling.request_call(origin, payload).await
            }
            ClientEvent::JoinRoom(payload) => self.signaling.join_room(origin, payload).await,
            ClientEvent::CallUser(payload) => self.signaling.call_user(origin, payload).await,
            ClientEvent::CallAccepted(payload) => self.signaling.accept_call(origin, payload).await,
            ClientEvent::IceCandidate(payload) => {
                self.signaling.relay_ice_candidate(origin, payload).await
            }
            ClientEvent::CallEnded(payload) => self.signaling.end_call(origin, payload).await,
            ClientEvent::Offer(payload) => self.signaling.compat_offer(origin, payload).await,
            ClientEvent::Answer(payload) => self.signaling.compat_answer(origin, payload).await,
            ClientEvent::CompatIceCandidate(payload) => {
                self.signaling.compat_ice_candidate(origin, payload).await
            }
            ClientEvent::EndCall(payload) => self.signaling.compat_end_call(origin, payload).await,
        }
    }

    /// 关闭连接：丢弃出站通道并清理注册表与房间
    ///
    /// 只有成功注销连接的一方执行清理，连接已被关闭时返回 `None`。
    pub async fn close(&self, connection_id: ConnectionId) -> Option<DisconnectSummary> {
        if !self
            .connections
            .unregister_connection(connection_id)
            .await
        {
            return None;
        }
        Some(self.disconnect(connection_id).await)
    }

    /// 从所有注册表和房间中移除连接，并广播新的在线快照
    pub async fn disconnect(&self, connection_id: ConnectionId) -> DisconnectSummary {
        let summary = DisconnectSummary {
            primary: self.primary.unregister_by_handle(connection_id).await,
            secondary: self.secondary.unregister_by_handle(connection_id).await,
            compat: self.compat.unregister_by_handle(connection_id).await,
            rooms: self.rooms.leave_all(connection_id).await,
        };

        info!(
            connection_id = %connection_id,
            primary = summary.primary.len(),
            secondary = summary.secondary.len(),
            compat = summary.compat.len(),
            rooms = summary.rooms.len(),
            "连接已断开，完成清理"
        );

        self.presence.broadcast().await;
        if !summary.compat.is_empty() {
            self.presence.broadcast_compat().await;
        }

        summary
    }

    /// 超时未活跃的连接
    pub async fn idle_connections(&self, timeout: Duration) -> Vec<ConnectionId> {
        self.connections.idle_connections(timeout).await
    }

    pub async fn presence_snapshot(&self) -> Vec<PresenceEntry> {
        self.presence.snapshot().await
    }

    pub fn registry(&self, namespace: Namespace) -> &IdentityRegistry {
        match namespace {
            Namespace::Primary => &self.primary,
            Namespace::Secondary => &self.secondary,
            Namespace::Compat => &self.compat,
        }
    }

    pub fn rooms(&self) -> &RoomTable {
        &self.rooms
    }

    pub async fn connection_count(&self) -> usize {
        self.connections.get_stats().await.active_connections
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::RecordingRouter;
    use async_trait::async_trait;
    use domain::{
        CallUserPayload, CompatPeer, CompatRoster, ConnectionStats, IncomingCallPayload,
        JoinRoomPayload, MockUserRepository, RelayError, ServerEvent, UserJoinedPayload,
    };
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::mpsc;

    fn id(value: &str) -> Identity {
        Identity::parse(value).unwrap()
    }

    fn hub() -> (RelayHub, Arc<RecordingRouter>) {
        let router = Arc::new(RecordingRouter::new());
        let hub = RelayHub::new(RelayHubDependencies {
            connections: router.clone(),
            router: router.clone(),
            users: Arc::new(MockUserRepository::new()),
        });
        (hub, router)
    }

    async fn open(hub: &RelayHub) -> ConnectionId {
        let (tx, _rx) = mpsc::unbounded_channel();
        let connection_id = ConnectionId::new();
        hub.connect(connection_id, tx).await;
        connection_id
    }

    fn snapshot_ids(entries: &[PresenceEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_join_user_broadcasts_snapshot_to_everyone() {
        let (hub, router) = hub();
        let a = open(&hub).await;
        let b = open(&hub).await;

        let delivery = hub.dispatch(a, ClientEvent::JoinUser(id("user-a"))).await;

        assert_eq!(delivery, Delivery::Fanout(2));
        let expected = vec![ServerEvent::Users(vec![PresenceEntry {
            id: id("user-a"),
            socket_id: a,
        }])];
        assert_eq!(router.named_for(a, "getUsers"), expected);
        assert_eq!(router.named_for(b, "getUsers"), expected);
    }

    #[tokio::test]
    async fn test_snapshot_tracks_registrations_and_disconnects() {
        let (hub, _router) = hub();
        let a = open(&hub).await;
        let b = open(&hub).await;
        let c = open(&hub).await;

        hub.dispatch(a, ClientEvent::JoinUser(id("user-a"))).await;
        hub.dispatch(b, ClientEvent::JoinUser(id("user-b"))).await;
        hub.dispatch(c, ClientEvent::JoinUser(id("user-c"))).await;
        hub.close(b).await;

        assert_eq!(
            snapshot_ids(&hub.presence_snapshot().await),
            vec!["user-a", "user-c"]
        );
    }

    #[tokio::test]
    async fn test_superseded_disconnect_keeps_reconnected_identity() {
        let (hub, router) = hub();
        let old = open(&hub).await;
        let new = open(&hub).await;

        hub.dispatch(old, ClientEvent::JoinUser(id("user-a"))).await;
        hub.dispatch(new, ClientEvent::JoinUser(id("user-a"))).await;
        router.clear();

        let summary = hub.close(old).await.unwrap();

        assert!(summary.primary.is_empty());
        assert_eq!(
            hub.registry(Namespace::Primary).lookup(&id("user-a")).await,
            Some(new)
        );
        // 断开后仍然广播一次快照
        assert_eq!(router.named_for(new, "getUsers").len(), 1);
    }

    #[tokio::test]
    async fn test_close_runs_cleanup_once() {
        let (hub, _router) = hub();
        let a = open(&hub).await;
        hub.dispatch(a, ClientEvent::JoinUser(id("user-a"))).await;

        assert!(hub.close(a).await.is_some());
        assert!(hub.close(a).await.is_none());
        assert_eq!(hub.connection_count().await, 0);
    }

    #[tokio::test]
    async fn test_events_after_close_register_nothing() {
        let (hub, router) = hub();
        let a = open(&hub).await;
        let observer = open(&hub).await;
        assert!(hub.close(a).await.is_some());
        router.clear();

        let room_id = RoomId::parse("r1").unwrap();
        let outcomes = [
            hub.dispatch(a, ClientEvent::JoinUser(id("ghost"))).await,
            hub.dispatch(a, ClientEvent::JoinUserByName(id("ghost"))).await,
            hub.dispatch(
                a,
                ClientEvent::JoinRoom(JoinRoomPayload {
                    room_id: room_id.clone(),
                    phone_id: id("ghost"),
                }),
            )
            .await,
        ];

        for outcome in outcomes {
            assert_eq!(outcome, Delivery::Dropped(DropReason::OriginClosed));
        }
        assert!(hub.close(a).await.is_none());
        assert!(hub.presence_snapshot().await.is_empty());
        assert!(hub.registry(Namespace::Compat).is_empty().await);
        assert!(hub.registry(Namespace::Secondary).is_empty().await);
        assert_eq!(hub.rooms().room_count().await, 0);
        assert!(router.events_for(observer).is_empty());
    }

    #[tokio::test]
    async fn test_touch_reports_closed_connection() {
        let (hub, _router) = hub();
        let a = open(&hub).await;

        assert!(hub.touch(a).await);
        hub.close(a).await;
        assert!(!hub.touch(a).await);
    }

    /// 第一次检查时在线，之后视为已被清扫器关闭
    struct ClosesDuringDispatch {
        inner: Arc<RecordingRouter>,
        checks: AtomicUsize,
    }

    #[async_trait]
    impl ConnectionManager for ClosesDuringDispatch {
        async fn register_connection(&self, connection_id: ConnectionId, sender: OutboundSender) {
            self.inner.register_connection(connection_id, sender).await;
        }

        async fn unregister_connection(&self, connection_id: ConnectionId) -> bool {
            self.inner.unregister_connection(connection_id).await
        }

        async fn update_connection_activity(
            &self,
            connection_id: ConnectionId,
        ) -> Result<(), RelayError> {
            self.inner.update_connection_activity(connection_id).await
        }

        async fn idle_connections(&self, timeout: Duration) -> Vec<ConnectionId> {
            self.inner.idle_connections(timeout).await
        }

        async fn is_connected(&self, _connection_id: ConnectionId) -> bool {
            self.checks.fetch_add(1, Ordering::SeqCst) == 0
        }

        async fn get_stats(&self) -> ConnectionStats {
            ConnectionManager::get_stats(&*self.inner).await
        }
    }

    #[tokio::test]
    async fn test_registration_racing_close_is_rolled_back() {
        let router = Arc::new(RecordingRouter::new());
        let hub = RelayHub::new(RelayHubDependencies {
            connections: Arc::new(ClosesDuringDispatch {
                inner: router.clone(),
                checks: AtomicUsize::new(0),
            }),
            router: router.clone(),
            users: Arc::new(MockUserRepository::new()),
        });
        let a = open(&hub).await;

        let outcome = hub.dispatch(a, ClientEvent::JoinUser(id("late"))).await;

        assert_eq!(outcome, Delivery::Dropped(DropReason::OriginClosed));
        assert!(hub.registry(Namespace::Primary).is_empty().await);
        assert!(hub.presence_snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn test_compat_roster_broadcast() {
        let (hub, router) = hub();
        let a = open(&hub).await;
        let b = open(&hub).await;

        hub.dispatch(a, ClientEvent::JoinUserByName(id("alice"))).await;

        let roster = CompatRoster(vec![CompatPeer {
            username: id("alice"),
            id: a,
        }]);
        assert_eq!(
            router.named_for(b, "joined"),
            vec![ServerEvent::Joined(roster)]
        );

        router.clear();
        hub.close(a).await;
        assert_eq!(
            router.named_for(b, "joined"),
            vec![ServerEvent::Joined(CompatRoster::default())]
        );
    }

    #[tokio::test]
    async fn test_compat_roster_follows_join_order() {
        let (hub, router) = hub();
        let z = open(&hub).await;
        let m = open(&hub).await;
        let a = open(&hub).await;

        hub.dispatch(z, ClientEvent::JoinUserByName(id("zoe"))).await;
        hub.dispatch(m, ClientEvent::JoinUserByName(id("mia"))).await;
        hub.dispatch(a, ClientEvent::JoinUserByName(id("ava"))).await;

        let Some(ServerEvent::Joined(roster)) = router.named_for(a, "joined").pop() else {
            panic!("no roster delivered");
        };
        assert_eq!(roster.usernames().collect::<Vec<_>>(), vec!["zoe", "mia", "ava"]);
    }

    #[tokio::test]
    async fn test_disconnect_leaves_rooms() {
        let (hub, _router) = hub();
        let a = open(&hub).await;
        let room_id = RoomId::parse("r1").unwrap();

        hub.dispatch(
            a,
            ClientEvent::JoinRoom(JoinRoomPayload {
                room_id: room_id.clone(),
                phone_id: id("A"),
            }),
        )
        .await;
        let summary = hub.close(a).await.unwrap();

        assert_eq!(summary.secondary, vec![id("A")]);
        assert_eq!(summary.rooms, vec![room_id]);
        assert_eq!(hub.rooms().room_count().await, 0);
    }

    #[tokio::test]
    async fn test_room_pairing_and_offer_scenario() {
        let (hub, router) = hub();
        let a = open(&hub).await;
        let b = open(&hub).await;

        hub.dispatch(a, ClientEvent::JoinUser(id("A"))).await;
        hub.dispatch(b, ClientEvent::JoinUser(id("B"))).await;
        let r1 = RoomId::parse("r1").unwrap();
        hub.dispatch(
            a,
            ClientEvent::JoinRoom(JoinRoomPayload {
                room_id: r1.clone(),
                phone_id: id("A"),
            }),
        )
        .await;
        hub.dispatch(
            b,
            ClientEvent::JoinRoom(JoinRoomPayload {
                room_id: r1,
                phone_id: id("B"),
            }),
        )
        .await;

        assert_eq!(
            router.named_for(a, "user-joined"),
            vec![ServerEvent::UserJoined(UserJoinedPayload { user_id: id("B") })]
        );
        assert!(router.named_for(b, "user-joined").is_empty());

        hub.dispatch(
            a,
            ClientEvent::CallUser(CallUserPayload {
                phone_id: id("B"),
                offer: json!("X"),
            }),
        )
        .await;

        assert_eq!(
            router.named_for(b, "incomming-call"),
            vec![ServerEvent::IncomingCall(IncomingCallPayload {
                from: Some(id("A")),
                offer: json!("X"),
            })]
        );
        assert!(router.named_for(a, "incomming-call").is_empty());
    }
}
