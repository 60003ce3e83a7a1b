use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{validate_conversation_id, ConversationStore, Result};
use crate::llm::ChatMessage;

/// Process-local conversation store
///
/// Used when no Message DB is configured, and by tests. History is lost when
/// the process exits.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    conversations: RwLock<HashMap<String, Vec<ChatMessage>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored conversations
    pub async fn conversation_count(&self) -> usize {
        self.conversations.read().await.len()
    }
}

#[async_trait]
impl ConversationStore for InMemoryStore {
    async fn append(&self, conversation_id: &str, message: ChatMessage) -> Result<()> {
        validate_conversation_id(conversation_id)?;

        self.conversations
            .write()
            .await
            .entry(conversation_id.to_string())
            .or_default()
            .push(message);
        Ok(())
    }

    async fn read_all(&self, conversation_id: &str) -> Result<Vec<ChatMessage>> {
        validate_conversation_id(conversation_id)?;

        Ok(self
            .conversations
            .read()
            .await
            .get(conversation_id)
            .cloned()
            .unwrap_or_default())
    }
}
