//! WebSocket相关实体
//!
//! 定义中继的线上协议：每个文本帧是一个 `{"event": ..., "data": ...}` 对象，
//! 事件名沿用现有客户端监听的名字。

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::errors::RelayError;
use crate::value_objects::{ConnectionId, Identity, RoomId, UserId};

/// 客户端到服务器的事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ClientEvent {
    /// 主命名空间注册（用户ID）
    #[serde(rename = "joinUser")]
    JoinUser(Identity),
    /// 兼容命名空间注册（用户名）
    #[serde(rename = "join-user")]
    JoinUserByName(Identity),
    /// 发送聊天通知
    #[serde(rename = "sendMessage")]
    SendMessage(SendMessagePayload),
    /// 发起视频通话请求
    #[serde(rename = "requestingVideoCall")]
    RequestingVideoCall(CallRequestPayload),
    /// 加入通话房间
    #[serde(rename = "join-room")]
    JoinRoom(JoinRoomPayload),
    /// 呼叫（携带 offer）
    #[serde(rename = "call-user")]
    CallUser(CallUserPayload),
    /// 接听（携带 answer）
    #[serde(rename = "call-accepted")]
    CallAccepted(CallAcceptedPayload),
    /// ICE 候选
    #[serde(rename = "ice-candidate")]
    IceCandidate(IceCandidatePayload),
    /// 挂断
    #[serde(rename = "call-ended")]
    CallEnded(CallEndedPayload),
    /// 兼容客户端：offer
    #[serde(rename = "offer")]
    Offer(CompatOfferPayload),
    /// 兼容客户端：answer
    #[serde(rename = "answer")]
    Answer(CompatAnswerPayload),
    /// 兼容客户端：ICE 候选
    #[serde(rename = "icecandidate")]
    CompatIceCandidate(CompatCandidatePayload),
    /// 兼容客户端：挂断
    #[serde(rename = "end-call")]
    EndCall(CompatEndCallPayload),
}

impl ClientEvent {
    /// 从JSON字符串反序列化
    pub fn from_json(json: &str) -> Result<Self, RelayError> {
        serde_json::from_str(json).map_err(|e| RelayError::InvalidFrame(e.to_string()))
    }

    pub fn name(&self) -> &'static str {
        match self {
            ClientEvent::JoinUser(_) => "joinUser",
            ClientEvent::JoinUserByName(_) => "join-user",
            ClientEvent::SendMessage(_) => "sendMessage",
            ClientEvent::RequestingVideoCall(_) => "requestingVideoCall",
            ClientEvent::JoinRoom(_) => "join-room",
            ClientEvent::CallUser(_) => "call-user",
            ClientEvent::CallAccepted(_) => "call-accepted",
            ClientEvent::IceCandidate(_) => "ice-candidate",
            ClientEvent::CallEnded(_) => "call-ended",
            ClientEvent::Offer(_) => "offer",
            ClientEvent::Answer(_) => "answer",
            ClientEvent::CompatIceCandidate(_) => "icecandidate",
            ClientEvent::EndCall(_) => "end-call",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessagePayload {
    pub sender_id: Identity,
    pub receiver_id: Identity,
    pub message: String,
    #[serde(default)]
    pub conversation_id: Option<String>,
}

/// 通话请求，入站和出站使用同一结构
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallRequestPayload {
    pub sender_id: Identity,
    pub receiver_id: Identity,
    #[serde(default)]
    pub conversation_id: Option<String>,
    #[serde(default)]
    pub room_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRoomPayload {
    pub room_id: RoomId,
    pub phone_id: Identity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallUserPayload {
    pub phone_id: Identity,
    #[serde(default)]
    pub offer: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallAcceptedPayload {
    pub phone_id: Identity,
    #[serde(default)]
    pub answer: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidatePayload {
    pub to_phone_id: Identity,
    #[serde(default)]
    pub candidate: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallEndedPayload {
    pub phone_id: Identity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompatOfferPayload {
    pub from: Identity,
    pub to: Identity,
    #[serde(default)]
    pub offer: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompatAnswerPayload {
    pub from: Identity,
    pub to: Identity,
    #[serde(default)]
    pub answer: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompatCandidatePayload {
    pub from: Identity,
    pub to: Identity,
    #[serde(default)]
    pub candidate: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompatEndCallPayload {
    pub from: Identity,
    pub to: Identity,
}

/// 服务器到客户端的事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    /// 主命名空间在线快照
    #[serde(rename = "getUsers")]
    Users(Vec<PresenceEntry>),
    /// 兼容命名空间在线名单
    #[serde(rename = "joined")]
    Joined(CompatRoster),
    /// 富化后的聊天通知
    #[serde(rename = "getMessage")]
    GetMessage(ChatDelivery),
    /// 视频通话请求
    #[serde(rename = "requestingForAcceptingVideoCall")]
    RequestingForAcceptingVideoCall(CallRequestPayload),
    /// 房间加入确认
    #[serde(rename = "joined-room")]
    JoinedRoom(JoinedRoomPayload),
    /// 对端加入房间
    #[serde(rename = "user-joined")]
    UserJoined(UserJoinedPayload),
    /// 来电（客户端监听的事件名就是这个拼写）
    #[serde(rename = "incomming-call")]
    IncomingCall(IncomingCallPayload),
    #[serde(rename = "call-accepted")]
    CallAccepted(CallAnswerPayload),
    #[serde(rename = "ice-candidate")]
    IceCandidate(CandidatePayload),
    #[serde(rename = "call-ended")]
    CallEnded(CallEndPayload),
    #[serde(rename = "offer")]
    Offer(CompatOfferPayload),
    #[serde(rename = "answer")]
    Answer(CompatAnswerPayload),
    #[serde(rename = "icecandidate")]
    CompatIceCandidate(CompatCandidatePayload),
    #[serde(rename = "end-call")]
    EndCall(CompatEndCallPayload),
}

impl ServerEvent {
    /// 序列化为JSON字符串
    pub fn to_json(&self) -> Result<String, RelayError> {
        serde_json::to_string(self).map_err(|e| RelayError::InvalidFrame(e.to_string()))
    }

    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::Users(_) => "getUsers",
            ServerEvent::Joined(_) => "joined",
            ServerEvent::GetMessage(_) => "getMessage",
            ServerEvent::RequestingForAcceptingVideoCall(_) => "requestingForAcceptingVideoCall",
            ServerEvent::JoinedRoom(_) => "joined-room",
            ServerEvent::UserJoined(_) => "user-joined",
            ServerEvent::IncomingCall(_) => "incomming-call",
            ServerEvent::CallAccepted(_) => "call-accepted",
            ServerEvent::IceCandidate(_) => "ice-candidate",
            ServerEvent::CallEnded(_) => "call-ended",
            ServerEvent::Offer(_) => "offer",
            ServerEvent::Answer(_) => "answer",
            ServerEvent::CompatIceCandidate(_) => "icecandidate",
            ServerEvent::EndCall(_) => "end-call",
        }
    }
}

/// 在线快照中的一项
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceEntry {
    pub id: Identity,
    pub socket_id: ConnectionId,
}

/// 兼容名单中的一项
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompatPeer {
    pub username: Identity,
    pub id: ConnectionId,
}

/// 兼容名单，线上格式是以用户名为键的对象，键按加入顺序排列
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompatRoster(pub Vec<CompatPeer>);

impl CompatRoster {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn usernames(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|peer| peer.username.as_str())
    }
}

impl FromIterator<CompatPeer> for CompatRoster {
    fn from_iter<I: IntoIterator<Item = CompatPeer>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Serialize for CompatRoster {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for peer in &self.0 {
            map.serialize_entry(peer.username.as_str(), peer)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for CompatRoster {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RosterVisitor;

        impl<'de> Visitor<'de> for RosterVisitor {
            type Value = CompatRoster;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object of compat peers keyed by username")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut peers = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((_, peer)) = access.next_entry::<String, CompatPeer>()? {
                    peers.push(peer);
                }
                Ok(CompatRoster(peers))
            }
        }

        deserializer.deserialize_map(RosterVisitor)
    }
}

/// 富化消息中附带的发送者资料
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SenderSummary {
    pub phone: String,
    pub fullname: String,
    #[serde(rename = "_id")]
    pub id: UserId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatDelivery {
    pub sender_id: Identity,
    pub message: String,
    pub conversation_id: Option<String>,
    pub receiver_id: Identity,
    pub user: SenderSummary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinedRoomPayload {
    pub room_id: RoomId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserJoinedPayload {
    pub user_id: Identity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomingCallPayload {
    pub from: Option<Identity>,
    pub offer: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallAnswerPayload {
    pub from: Option<Identity>,
    pub answer: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidatePayload {
    pub from: Option<Identity>,
    pub candidate: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallEndPayload {
    pub from: Option<Identity>,
}
