//! 信令路由
//!
//! 把通话请求、offer/answer、ICE 候选和挂断事件转发给目标身份对应的连接。
//! 负载（SDP、候选）对中继不透明，原样透传。所有转发都不回执。

use std::fmt;
use std::sync::Arc;

use domain::{
    CallAcceptedPayload, CallAnswerPayload, CallEndPayload, CallEndedPayload, CallRequestPayload,
    CallUserPayload, CandidatePayload, CompatAnswerPayload, CompatCandidatePayload,
    CompatEndCallPayload, CompatOfferPayload, ConnectionId, IceCandidatePayload, Identity,
    IncomingCallPayload, JoinRoomPayload, JoinedRoomPayload, MessageRouter, ServerEvent,
    UserJoinedPayload,
};
use tracing::{debug, info, warn};

use crate::delivery::{Delivery, DropReason};
use crate::registry::IdentityRegistry;
use crate::rooms::RoomTable;

/// 信令种类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    CallRequest,
    CallOffer,
    CallAnswer,
    IceCandidate,
    CallEnd,
    CompatOffer,
    CompatAnswer,
    CompatIceCandidate,
    CompatEndCall,
}

/// 目标身份的解析方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Primary,
    Secondary,
    /// 先查次命名空间，找不到再查兼容命名空间
    SecondaryThenCompat,
}

impl SignalKind {
    pub fn resolution(&self) -> Resolution {
        match self {
            SignalKind::CallRequest => Resolution::Primary,
            SignalKind::CallOffer
            | SignalKind::CallAnswer
            | SignalKind::IceCandidate
            | SignalKind::CallEnd => Resolution::Secondary,
            SignalKind::CompatOffer
            | SignalKind::CompatAnswer
            | SignalKind::CompatIceCandidate
            | SignalKind::CompatEndCall => Resolution::SecondaryThenCompat,
        }
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SignalKind::CallRequest => "call_request",
            SignalKind::CallOffer => "call_offer",
            SignalKind::CallAnswer => "call_answer",
            SignalKind::IceCandidate => "ice_candidate",
            SignalKind::CallEnd => "call_end",
            SignalKind::CompatOffer => "compat_offer",
            SignalKind::CompatAnswer => "compat_answer",
            SignalKind::CompatIceCandidate => "compat_ice_candidate",
            SignalKind::CompatEndCall => "compat_end_call",
        };
        f.write_str(name)
    }
}

pub struct SignalingRouter {
    primary: Arc<IdentityRegistry>,
    secondary: Arc<IdentityRegistry>,
    compat: Arc<IdentityRegistry>,
    rooms: Arc<RoomTable>,
    router: Arc<dyn MessageRouter>,
}

impl SignalingRouter {
    pub fn new(
        primary: Arc<IdentityRegistry>,
        secondary: Arc<IdentityRegistry>,
        compat: Arc<IdentityRegistry>,
        rooms: Arc<RoomTable>,
        router: Arc<dyn MessageRouter>,
    ) -> Self {
        Self {
            primary,
            secondary,
            compat,
            rooms,
            router,
        }
    }

    /// 按种类要求的注册表解析目标身份
    pub async fn resolve(&self, target: &Identity, kind: SignalKind) -> Option<ConnectionId> {
        match kind.resolution() {
            Resolution::Primary => self.primary.lookup(target).await,
            Resolution::Secondary => self.secondary.lookup(target).await,
            Resolution::SecondaryThenCompat => match self.secondary.lookup(target).await {
                Some(connection_id) => Some(connection_id),
                None => self.compat.lookup(target).await,
            },
        }
    }

    /// 把事件转发给目标身份的当前连接，解析不到时丢弃
    pub async fn relay_to_identity(
        &self,
        origin: ConnectionId,
        target: &Identity,
        kind: SignalKind,
        event: ServerEvent,
    ) -> Delivery {
        let Some(connection_id) = self.resolve(target, kind).await else {
            debug!(
                origin = %origin,
                target = %target,
                kind = %kind,
                "目标身份不在线，信令丢弃"
            );
            return Delivery::Dropped(DropReason::UnknownIdentity);
        };

        match self.router.route_to_connection(connection_id, event).await {
            Ok(()) => {
                debug!(origin = %origin, target = %target, kind = %kind, "信令已转发");
                Delivery::Delivered(connection_id)
            }
            Err(e) => {
                warn!(target = %target, kind = %kind, error = %e, "信令转发失败");
                Delivery::Dropped(DropReason::ChannelClosed)
            }
        }
    }

    /// 加入房间
    ///
    /// 在次命名空间登记自己的身份，向调用方确认，并只通知房间内已有的其他成员。
    pub async fn join_room(&self, origin: ConnectionId, payload: JoinRoomPayload) -> Delivery {
        let JoinRoomPayload { room_id, phone_id } = payload;

        self.secondary.register(phone_id.clone(), origin).await;
        let others = self.rooms.join(&room_id, origin).await;

        info!(
            room_id = %room_id,
            phone_id = %phone_id,
            existing_members = others.len(),
            "加入通话房间"
        );

        let confirm = ServerEvent::JoinedRoom(JoinedRoomPayload {
            room_id: room_id.clone(),
        });
        if let Err(e) = self.router.route_to_connection(origin, confirm).await {
            warn!(room_id = %room_id, error = %e, "房间确认发送失败");
        }

        if others.is_empty() {
            return Delivery::Fanout(0);
        }

        let notice = ServerEvent::UserJoined(UserJoinedPayload { user_id: phone_id });
        match self.router.route_to_connections(&others, notice).await {
            Ok(count) => Delivery::Fanout(count),
            Err(e) => {
                warn!(room_id = %room_id, error = %e, "通知房间成员失败");
                Delivery::Fanout(0)
            }
        }
    }

    /// 视频通话请求，通过主命名空间查找接收方
    pub async fn request_call(&self, origin: ConnectionId, payload: CallRequestPayload) -> Delivery {
        let target = payload.receiver_id.clone();
        self.relay_to_identity(
            origin,
            &target,
            SignalKind::CallRequest,
            ServerEvent::RequestingForAcceptingVideoCall(payload),
        )
        .await
    }

    pub async fn call_user(&self, origin: ConnectionId, payload: CallUserPayload) -> Delivery {
        let from = self.secondary.identity_of(origin).await;
        self.relay_to_identity(
            origin,
            &payload.phone_id,
            SignalKind::CallOffer,
            ServerEvent::IncomingCall(IncomingCallPayload {
                from,
                offer: payload.offer,
            }),
        )
        .await
    }

    pub async fn accept_call(&self, origin: ConnectionId, payload: CallAcceptedPayload) -> Delivery {
        let from = self.secondary.identity_of(origin).await;
        self.relay_to_identity(
            origin,
            &payload.phone_id,
            SignalKind::CallAnswer,
            ServerEvent::CallAccepted(CallAnswerPayload {
                from,
                answer: payload.answer,
            }),
        )
        .await
    }

    pub async fn relay_ice_candidate(
        &self,
        origin: ConnectionId,
        payload: IceCandidatePayload,
    ) -> Delivery {
        let from = self.secondary.identity_of(origin).await;
        self.relay_to_identity(
            origin,
            &payload.to_phone_id,
            SignalKind::IceCandidate,
            ServerEvent::IceCandidate(CandidatePayload {
                from,
                candidate: payload.candidate,
            }),
        )
        .await
    }

    pub async fn end_call(&self, origin: ConnectionId, payload: CallEndedPayload) -> Delivery {
        let from = self.secondary.identity_of(origin).await;
        self.relay_to_identity(
            origin,
            &payload.phone_id,
            SignalKind::CallEnd,
            ServerEvent::CallEnded(CallEndPayload { from }),
        )
        .await
    }

    pub async fn compat_offer(&self, origin: ConnectionId, payload: CompatOfferPayload) -> Delivery {
        let target = payload.to.clone();
        self.relay_to_identity(origin, &target, SignalKind::CompatOffer, ServerEvent::Offer(payload))
            .await
    }

    /// answer 发回给 offer 的发起方，也就是负载中的 `from`
    pub async fn compat_answer(
        &self,
        origin: ConnectionId,
        payload: CompatAnswerPayload,
    ) -> Delivery {
        let target = payload.from.clone();
        self.relay_to_identity(
            origin,
            &target,
            SignalKind::CompatAnswer,
            ServerEvent::Answer(payload),
        )
        .await
    }

    pub async fn compat_ice_candidate(
        &self,
        origin: ConnectionId,
        payload: CompatCandidatePayload,
    ) -> Delivery {
        let target = payload.to.clone();
        self.relay_to_identity(
            origin,
            &target,
            SignalKind::CompatIceCandidate,
            ServerEvent::CompatIceCandidate(payload),
        )
        .await
    }

    pub async fn compat_end_call(
        &self,
        origin: ConnectionId,
        payload: CompatEndCallPayload,
    ) -> Delivery {
        let target = payload.to.clone();
        self.relay_to_identity(
            origin,
            &target,
            SignalKind::CompatEndCall,
            ServerEvent::EndCall(payload),
        )
        .await
    }
}
