//! AI-agent conversation repository trait definition.

use async_trait::async_trait;

use super::RepositoryError;
use crate::domain::{AgentConversation, AgentMessage, MessageRole};

/// Repository for agent conversations and their messages.
#[async_trait]
pub trait AgentRepository: Send + Sync {
    async fn create_conversation(
        &self,
        business_id: i64,
        visitor_id: Option<i64>,
    ) -> Result<AgentConversation, RepositoryError>;

    async fn get_conversation(&self, id: i64) -> Result<AgentConversation, RepositoryError>;

    /// Messages in chronological order.
    async fn list_messages(
        &self,
        conversation_id: i64,
    ) -> Result<Vec<AgentMessage>, RepositoryError>;

    /// Append a message and bump the conversation's `updated_at`.
    async fn save_message(
        &self,
        conversation_id: i64,
        role: MessageRole,
        content: &str,
    ) -> Result<AgentMessage, RepositoryError>;
}
