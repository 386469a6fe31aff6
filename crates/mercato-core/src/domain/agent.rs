//! AI-agent concierge conversations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

string_enum! {
    /// The role of a message sender.
    pub enum MessageRole {
        System => "system",
        User => "user",
        Assistant => "assistant",
    }
}

/// A visitor's conversation with an AI-agent listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConversation {
    pub id: i64,
    pub business_id: i64,
    /// Signed-in visitor, if any. Anonymous conversations are readable by id.
    pub visitor_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentMessage {
    pub id: i64,
    pub conversation_id: i64,
    pub role: MessageRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Chat request body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AgentChatRequest {
    pub conversation_id: Option<i64>,
    pub message: String,
}

/// The assistant's answer to one chat turn.
#[derive(Debug, Clone, Serialize)]
pub struct AgentReply {
    pub conversation_id: i64,
    pub message: AgentMessage,
}

/// Full conversation as returned to the visitor.
#[derive(Debug, Clone, Serialize)]
pub struct AgentTranscript {
    pub conversation: AgentConversation,
    pub messages: Vec<AgentMessage>,
}
