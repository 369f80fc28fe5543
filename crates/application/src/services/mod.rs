mod conversation_service;
mod user_service;

pub use conversation_service::{
    ConversationService, ConversationServiceDependencies, NEW_CONVERSATION_PLACEHOLDER,
};
pub use user_service::{UserService, UserServiceDependencies};
