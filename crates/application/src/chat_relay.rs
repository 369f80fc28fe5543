//! 聊天通知转发
//!
//! 接收方不在线时不投递也不报错；在线时用发送者资料富化后只发给接收方。

use std::sync::Arc;

use domain::{
    ChatDelivery, ConnectionId, MessageRouter, SendMessagePayload, SenderSummary, ServerEvent,
    UserId, UserRepository,
};
use tracing::{debug, info, warn};

use crate::delivery::{Delivery, DropReason};
use crate::error::ApplicationError;
use crate::registry::IdentityRegistry;

pub struct ChatRelay {
    primary: Arc<IdentityRegistry>,
    users: Arc<dyn UserRepository>,
    router: Arc<dyn MessageRouter>,
}

impl ChatRelay {
    pub fn new(
        primary: Arc<IdentityRegistry>,
        users: Arc<dyn UserRepository>,
        router: Arc<dyn MessageRouter>,
    ) -> Self {
        Self {
            primary,
            users,
            router,
        }
    }

    pub async fn send_message(&self, origin: ConnectionId, payload: SendMessagePayload) -> Delivery {
        let Some(receiver) = self.primary.lookup(&payload.receiver_id).await else {
            debug!(receiver_id = %payload.receiver_id, "接收方不在线，不投递");
            return Delivery::Dropped(DropReason::RecipientOffline);
        };

        if receiver == origin {
            debug!(receiver_id = %payload.receiver_id, "接收方就是发送连接，不回显");
            return Delivery::Dropped(DropReason::SenderEcho);
        }

        let sender_id = UserId::from(&payload.sender_id);
        let user = match self.enrich(&sender_id).await {
            Ok(user) => user,
            Err(e) => {
                warn!(sender_id = %sender_id, error = %e, "发送者资料富化失败，本次转发中止");
                return Delivery::Dropped(DropReason::EnrichmentFailed);
            }
        };

        let SendMessagePayload {
            sender_id,
            receiver_id,
            message,
            conversation_id,
        } = payload;

        let event = ServerEvent::GetMessage(ChatDelivery {
            sender_id,
            message,
            conversation_id,
            receiver_id,
            user,
        });

        match self.router.route_to_connection(receiver, event).await {
            Ok(()) => {
                info!(connection_id = %receiver, "聊天通知已转发");
                Delivery::Delivered(receiver)
            }
            Err(e) => {
                warn!(connection_id = %receiver, error = %e, "聊天通知转发失败");
                Delivery::Dropped(DropReason::ChannelClosed)
            }
        }
    }

    async fn enrich(&self, sender_id: &UserId) -> Result<SenderSummary, ApplicationError> {
        let profile = self
            .users
            .find_by_id(sender_id)
            .await
            .map_err(|e| ApplicationError::Enrichment {
                user_id: sender_id.clone(),
                reason: e.to_string(),
            })?
            .ok_or_else(|| ApplicationError::ProfileNotFound(sender_id.clone()))?;

        Ok(SenderSummary {
            phone: profile.phone,
            fullname: profile.fullname,
            id: profile.id,
        })
    }
}
