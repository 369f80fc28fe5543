use std::sync::Arc;

use domain::{
    ChatMessage, Conversation, ConversationId, ConversationRepository, DomainError,
    MessageRepository, UserId, UserRepository,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    clock::Clock,
    dto::{
        sender_summary, ConversationStarted, ConversationSummary, ConversationView,
        CreateConversationRequest, MarkSeenRequest, MessageListItem, MessagePosted, MessageView,
        PostMessageRequest, SeenReceipt,
    },
    error::ApplicationError,
};

/// 消息列表的占位会话ID，客户端在还没有会话时使用
pub const NEW_CONVERSATION_PLACEHOLDER: &str = "new";

pub struct ConversationServiceDependencies {
    pub users: Arc<dyn UserRepository>,
    pub conversations: Arc<dyn ConversationRepository>,
    pub messages: Arc<dyn MessageRepository>,
    pub clock: Arc<dyn Clock>,
}

pub struct ConversationService {
    deps: ConversationServiceDependencies,
}

fn required(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn conversation_not_found(id: &str) -> ApplicationError {
    ApplicationError::Domain(DomainError::resource_not_found("Conversation", id))
}

impl ConversationService {
    pub fn new(deps: ConversationServiceDependencies) -> Self {
        Self { deps }
    }

    pub async fn create_conversation(
        &self,
        request: CreateConversationRequest,
    ) -> Result<ConversationView, ApplicationError> {
        let sender_id = UserId::new(request.sender_id.unwrap_or_default());
        let receiver_id = UserId::new(request.receiver_id.unwrap_or_default());

        let conversation = Conversation::new(sender_id, receiver_id, self.deps.clock.now())?;
        let stored = self.deps.conversations.create(conversation).await?;

        info!(conversation_id = %stored.id, "会话已创建");
        Ok(stored.into())
    }

    /// 当前用户参与的所有会话
    ///
    /// 对方资料不存在的会话不会出现在列表中。
    pub async fn list_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<ConversationSummary>, ApplicationError> {
        let current = UserId::new(user_id);
        let conversations = self.deps.conversations.list_for_member(&current).await?;

        let mut summaries = Vec::with_capacity(conversations.len());
        for conversation in conversations {
            let Some(counterpart) = conversation.counterpart(&current) else {
                continue;
            };
            let Some(profile) = self.deps.users.find_by_id(counterpart).await? else {
                warn!(
                    conversation_id = %conversation.id,
                    user_id = %counterpart,
                    "会话对方的资料不存在，跳过"
                );
                continue;
            };

            summaries.push(ConversationSummary {
                user: sender_summary(profile),
                conversation_id: conversation.id,
                last_message: conversation.last_message_preview(),
                last_message_time: conversation.last_message_time,
                is_last_message_from_current_user: conversation.last_message_sender_id.as_ref()
                    == Some(&current),
                last_message_sender_id: conversation.last_message_sender_id.clone(),
                has_seen: conversation.has_seen(&current),
                not_seen_by: conversation.not_seen_by.clone(),
            });
        }

        Ok(summaries)
    }

    /// 保存消息
    ///
    /// 没有会话ID但有接收方时先创建会话；有会话ID时先更新会话再追加消息。
    pub async fn post_message(
        &self,
        request: PostMessageRequest,
    ) -> Result<MessagePosted, ApplicationError> {
        let (Some(sender_id), Some(body)) = (required(request.sender_id), required(request.message))
        else {
            return Err(DomainError::validation_error(
                "message",
                "Please provide senderId and message",
            )
            .into());
        };
        let sender_id = UserId::new(sender_id);
        let now = self.deps.clock.now();

        match (required(request.conversation_id), required(request.receiver_id)) {
            (Some(conversation_id), _) => {
                let id = parse_conversation_id(&conversation_id)
                    .ok_or_else(|| conversation_not_found(&conversation_id))?;
                let mut conversation = self
                    .deps
                    .conversations
                    .find_by_id(id)
                    .await?
                    .ok_or_else(|| conversation_not_found(&conversation_id))?;

                let message = ChatMessage::new(id, sender_id.clone(), body.clone(), now)?;

                // 会话更新失败时不写入消息
                conversation.record_message(&sender_id, &body, now);
                self.deps.conversations.update(conversation).await?;
                let saved = self.deps.messages.append(message).await?;

                info!(conversation_id = %id, message_id = %saved.id, "消息已保存");
                Ok(MessagePosted::Appended(MessageView::from(saved)))
            }
            (None, Some(receiver_id)) => {
                let mut conversation =
                    Conversation::new(sender_id.clone(), UserId::new(receiver_id), now)?;
                conversation.record_message(&sender_id, &body, now);
                let conversation = self.deps.conversations.create(conversation).await?;

                let message = ChatMessage::new(conversation.id, sender_id, body, now)?;
                self.deps.messages.append(message).await?;

                info!(conversation_id = %conversation.id, "新会话已创建并保存首条消息");
                Ok(MessagePosted::ConversationStarted(ConversationStarted {
                    message: "message sent successfully".to_string(),
                    conversation_id: conversation.id,
                }))
            }
            (None, None) => Err(DomainError::validation_error(
                "conversationId",
                "Please provide conversationId or receiverId",
            )
            .into()),
        }
    }

    pub async fn list_messages(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<MessageListItem>, ApplicationError> {
        if conversation_id == NEW_CONVERSATION_PLACEHOLDER {
            return Ok(Vec::new());
        }
        let Some(id) = parse_conversation_id(conversation_id) else {
            return Err(
                DomainError::validation_error("conversationId", "Invalid conversationId").into(),
            );
        };

        let messages = self.deps.messages.list_by_conversation(id).await?;
        let mut items = Vec::with_capacity(messages.len());
        for message in messages {
            let Some(profile) = self.deps.users.find_by_id(&message.sender_id).await? else {
                warn!(message_id = %message.id, sender_id = %message.sender_id, "发送者资料不存在，跳过");
                continue;
            };
            items.push(MessageListItem {
                user: sender_summary(profile),
                message: message.message,
                created_at: message.created_at,
                id: message.id,
            });
        }

        Ok(items)
    }

    pub async fn mark_seen(
        &self,
        conversation_id: &str,
        request: MarkSeenRequest,
    ) -> Result<SeenReceipt, ApplicationError> {
        let Some(user_id) = required(request.user_id) else {
            return Err(DomainError::validation_error("userId", "userId is required").into());
        };

        let id = parse_conversation_id(conversation_id)
            .ok_or_else(|| conversation_not_found(conversation_id))?;
        let mut conversation = self
            .deps
            .conversations
            .find_by_id(id)
            .await?
            .ok_or_else(|| conversation_not_found(conversation_id))?;

        conversation.mark_seen(&UserId::new(user_id), self.deps.clock.now());
        self.deps.conversations.update(conversation).await?;

        Ok(SeenReceipt {
            message: "Conversation marked as seen".to_string(),
            conversation_id: id,
        })
    }
}

fn parse_conversation_id(value: &str) -> Option<ConversationId> {
    Uuid::parse_str(value).ok().map(ConversationId::from)
}
