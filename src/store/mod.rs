//! Conversation history storage
//!
//! A conversation is an append-only, ordered list of [`ChatMessage`]s keyed
//! by conversation id. Appends to different conversations are independent;
//! appends to one conversation are read back in the order they were made.

pub mod memory;
pub mod message_db;

use async_trait::async_trait;
use std::fmt;

use crate::llm::ChatMessage;

pub use memory::InMemoryStore;
pub use message_db::{MessageDbConfig, MessageDbStore};

/// Result type for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Error types for conversation store operations
#[derive(Debug)]
pub enum StoreError {
    /// Validation error - invalid conversation id or message
    ValidationError(String),

    /// Connection error - database unreachable or authentication failure
    ConnectionError(String),

    /// Database error - SQL errors, constraint violations
    DatabaseError(String),

    /// Pool error - connection pool issues
    PoolError(String),

    /// Stored data could not be decoded back into a message
    CorruptMessage(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            StoreError::ConnectionError(msg) => write!(f, "Connection error: {}", msg),
            StoreError::DatabaseError(msg) => write!(f, "Database error: {}", msg),
            StoreError::PoolError(msg) => write!(f, "Pool error: {}", msg),
            StoreError::CorruptMessage(msg) => write!(f, "Corrupt message: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

/// Convert tokio-postgres errors to store errors
impl From<tokio_postgres::Error> for StoreError {
    fn from(err: tokio_postgres::Error) -> Self {
        if let Some(db_error) = err.as_db_error() {
            return StoreError::DatabaseError(format!(
                "{}: {}",
                db_error.code().code(),
                db_error.message()
            ));
        }

        StoreError::DatabaseError(format!("{:?}", err))
    }
}

/// Convert deadpool errors to store errors
impl From<deadpool_postgres::PoolError> for StoreError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        StoreError::PoolError(err.to_string())
    }
}

/// Convert JSON errors to store errors
impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::CorruptMessage(format!("JSON error: {}", err))
    }
}

/// Append-only conversation history
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Push a message to the end of a conversation
    async fn append(&self, conversation_id: &str, message: ChatMessage) -> Result<()>;

    /// Read every message of a conversation in insertion order
    ///
    /// An unknown conversation reads as empty.
    async fn read_all(&self, conversation_id: &str) -> Result<Vec<ChatMessage>>;
}

/// Reject ids that cannot name a conversation
pub(crate) fn validate_conversation_id(conversation_id: &str) -> Result<()> {
    if conversation_id.trim().is_empty() {
        return Err(StoreError::ValidationError(
            "conversation id must not be empty".to_string(),
        ));
    }
    Ok(())
}
