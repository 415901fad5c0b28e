use super::ApiClient;
use async_trait::async_trait;
use reqwest::Method;
use shopfront_chat::{ChatApi, ChatError, ChatMessage, Conversation};

#[async_trait]
impl ChatApi for ApiClient {
    async fn conversations(&self) -> Result<Vec<Conversation>, ChatError> {
        self.request(Method::GET, "/chat/conversations")
            .execute()
            .await
            .map_err(ChatError::request)
    }

    async fn history(&self, user_id: &str) -> Result<Vec<ChatMessage>, ChatError> {
        self.request(Method::GET, "/chat/messages")
            .segments([user_id])
            .execute()
            .await
            .map_err(ChatError::request)
    }

    async fn mark_read(&self, user_id: &str) -> Result<(), ChatError> {
        self.request(Method::PUT, "/chat/messages")
            .segments([user_id, "read"])
            .execute_empty()
            .await
            .map_err(ChatError::request)
    }
}
