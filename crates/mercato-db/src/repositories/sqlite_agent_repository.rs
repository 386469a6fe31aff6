//! `SQLite` implementation of the `AgentRepository` trait.

use async_trait::async_trait;
use sqlx::SqlitePool;

use mercato_core::{AgentConversation, AgentMessage, AgentRepository, MessageRole, RepositoryError};

use super::row_mappers::{
    AGENT_MESSAGE_SELECT_COLUMNS, CONVERSATION_SELECT_COLUMNS, now, row_to_agent_message,
    row_to_conversation, storage, write_error,
};

/// Stores AI-agent conversations and their messages.
pub struct SqliteAgentRepository {
    pool: SqlitePool,
}

impl SqliteAgentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AgentRepository for SqliteAgentRepository {
    async fn create_conversation(
        &self,
        business_id: i64,
        visitor_id: Option<i64>,
    ) -> Result<AgentConversation, RepositoryError> {
        let stamp = now();
        let result = sqlx::query(
            "INSERT INTO agent_conversations (business_id, visitor_id, created_at, updated_at) VALUES (?, ?, ?, ?)",
        )
        .bind(business_id)
        .bind(visitor_id)
        .bind(&stamp)
        .bind(&stamp)
        .execute(&self.pool)
        .await
        .map_err(|e| write_error(e, "conversation"))?;

        self.get_conversation(result.last_insert_rowid()).await
    }

    async fn get_conversation(&self, id: i64) -> Result<AgentConversation, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {CONVERSATION_SELECT_COLUMNS} FROM agent_conversations WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage)?
        .ok_or_else(|| RepositoryError::NotFound(format!("conversation {id}")))?;

        row_to_conversation(&row)
    }

    async fn list_messages(
        &self,
        conversation_id: i64,
    ) -> Result<Vec<AgentMessage>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {AGENT_MESSAGE_SELECT_COLUMNS} FROM agent_messages WHERE conversation_id = ? ORDER BY created_at, id"
        ))
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await
        .map_err(storage)?;

        rows.iter().map(row_to_agent_message).collect()
    }

    async fn save_message(
        &self,
        conversation_id: i64,
        role: MessageRole,
        content: &str,
    ) -> Result<AgentMessage, RepositoryError> {
        let mut tx = self.pool.begin().await.map_err(storage)?;
        let stamp = now();

        let result = sqlx::query(
            "INSERT INTO agent_messages (conversation_id, role, content, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(conversation_id)
        .bind(role.as_str())
        .bind(content)
        .bind(&stamp)
        .execute(&mut *tx)
        .await
        .map_err(|e| write_error(e, "agent message"))?;

        sqlx::query("UPDATE agent_conversations SET updated_at = ? WHERE id = ?")
            .bind(&stamp)
            .bind(conversation_id)
            .execute(&mut *tx)
            .await
            .map_err(storage)?;

        let row = sqlx::query(&format!(
            "SELECT {AGENT_MESSAGE_SELECT_COLUMNS} FROM agent_messages WHERE id = ?"
        ))
        .bind(result.last_insert_rowid())
        .fetch_one(&mut *tx)
        .await
        .map_err(storage)?;
        let message = row_to_agent_message(&row)?;

        tx.commit().await.map_err(storage)?;
        Ok(message)
    }
}
