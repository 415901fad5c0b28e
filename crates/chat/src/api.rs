use crate::error::ChatError;
use crate::message::{ChatMessage, Conversation};
use async_trait::async_trait;

/// Request/response side of chat, served by the REST backend.
#[async_trait]
pub trait ChatApi: Send + Sync {
    /// The admin inbox.
    async fn conversations(&self) -> Result<Vec<Conversation>, ChatError>;

    /// Full message history with `user_id`.
    async fn history(&self, user_id: &str) -> Result<Vec<ChatMessage>, ChatError>;

    /// Mark every unread message from `user_id` as read.
    async fn mark_read(&self, user_id: &str) -> Result<(), ChatError>;
}
