//! 投递结果
//!
//! 中继核心的每次转发都是“发出即忘”，不会把错误回传给发送方。
//! 这里的结果只用于日志和测试断言。

use std::fmt;

use domain::ConnectionId;

/// 一次转发的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// 已放入目标连接的出站通道
    Delivered(ConnectionId),
    /// 已放入多个连接的出站通道
    Fanout(usize),
    /// 没有投递
    Dropped(DropReason),
}

impl Delivery {
    pub fn is_delivered(&self) -> bool {
        matches!(self, Delivery::Delivered(_))
    }
}

/// 丢弃原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// 接收方不在线
    RecipientOffline,
    /// 目标身份在所有可用注册表中都不存在
    UnknownIdentity,
    /// 解析出的目标连接就是发送方自己
    SenderEcho,
    /// 目标连接的出站通道已关闭
    ChannelClosed,
    /// 发送者资料富化失败
    EnrichmentFailed,
    /// 发出事件的连接已被关闭
    OriginClosed,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            DropReason::RecipientOffline => "recipient_offline",
            DropReason::UnknownIdentity => "unknown_identity",
            DropReason::SenderEcho => "sender_echo",
            DropReason::ChannelClosed => "channel_closed",
            DropReason::EnrichmentFailed => "enrichment_failed",
            DropReason::OriginClosed => "origin_closed",
        };
        f.write_str(reason)
    }
}
