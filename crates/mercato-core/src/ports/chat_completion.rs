//! Chat completion port used by AI-agent listings.

use async_trait::async_trait;

use super::ProviderError;
use crate::domain::MessageRole;

/// One turn of a prompt sent to the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTurn {
    pub role: MessageRole,
    pub content: String,
}

impl ChatTurn {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

#[async_trait]
pub trait ChatCompletionPort: Send + Sync {
    /// Run a completion and return the assistant's text.
    async fn complete(&self, model: &str, turns: &[ChatTurn]) -> Result<String, ProviderError>;
}
