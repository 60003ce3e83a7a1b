//! Conversation flows
//!
//! [`ChatService`] turns user questions into completion payloads, records the
//! user side of each turn, and hands the payload to the [`StreamRelay`],
//! which records the assistant side once the answer is complete.

use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use crate::llm::{ChatCompletionRequest, ChatMessage};
use crate::relay::{RelayError, RelayStream, StreamRelay};
use crate::retrieval::prompt::{
    build_question, format_context, HISTORY_SYSTEM_PROMPT, NO_CONTEXT_REPLY, SYSTEM_PROMPT,
};
use crate::retrieval::{RetrievalError, Retriever};
use crate::store::{ConversationStore, StoreError};

/// Errors from the conversation flows
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Relay(#[from] RelayError),

    #[error("Conversation store error: {0}")]
    Store(#[from] StoreError),

    #[error("Retrieval error: {0}")]
    Retrieval(#[from] RetrievalError),
}

/// Answer to a first question
pub enum QueryReply {
    /// Relayed completion
    Stream(RelayStream),
    /// Fixed text, nothing was recorded
    NoContext(&'static str),
}

/// Reply together with the conversation it belongs to
pub struct QueryOutcome {
    pub conversation_id: String,
    pub reply: QueryReply,
}

/// Drives the first-question and follow-up flows
pub struct ChatService {
    relay: StreamRelay,
    store: Arc<dyn ConversationStore>,
    retriever: Option<Arc<dyn Retriever>>,
    model: String,
    shutdown: CancellationToken,
}

impl ChatService {
    /// Create a service without retrieval
    pub fn new(
        relay: StreamRelay,
        store: Arc<dyn ConversationStore>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            relay,
            store,
            retriever: None,
            model: model.into(),
            shutdown: CancellationToken::new(),
        }
    }

    /// Look up documentation context for first questions
    pub fn with_retriever(mut self, retriever: Arc<dyn Retriever>) -> Self {
        self.retriever = Some(retriever);
        self
    }

    /// Cancel every open stream when `shutdown` fires
    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Start a conversation with a question
    ///
    /// A missing or blank `conversation_id` gets a fresh UUID. When retrieval
    /// is enabled but finds nothing, the fixed apology is returned and
    /// nothing is recorded.
    pub async fn begin_query(
        &self,
        query: &str,
        conversation_id: Option<String>,
    ) -> Result<QueryOutcome, ChatError> {
        let query = require_query(query)?;
        let conversation_id = conversation_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let snippets = match &self.retriever {
            Some(retriever) => {
                let snippets = retriever.retrieve(query).await?;
                if snippets.is_empty() {
                    info!(conversation_id = %conversation_id, "no relevant context found");
                    return Ok(QueryOutcome {
                        conversation_id,
                        reply: QueryReply::NoContext(NO_CONTEXT_REPLY),
                    });
                }
                snippets
            }
            None => Vec::new(),
        };
        debug!(conversation_id = %conversation_id, snippets = snippets.len(), "building first question");

        let question = build_question(query, &format_context(&snippets));

        // Only the short prompt is kept; follow-ups replay the history as is
        self.store
            .append(&conversation_id, ChatMessage::system(HISTORY_SYSTEM_PROMPT))
            .await?;
        self.store
            .append(&conversation_id, ChatMessage::user(question.clone()))
            .await?;

        let request = ChatCompletionRequest::streaming(
            self.model.clone(),
            vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(question)],
        );
        let stream = self.open(&conversation_id, request).await?;

        Ok(QueryOutcome {
            conversation_id,
            reply: QueryReply::Stream(stream),
        })
    }

    /// Ask a follow-up question in an existing conversation
    pub async fn continue_chat(
        &self,
        query: &str,
        conversation_id: &str,
    ) -> Result<RelayStream, ChatError> {
        let query = require_query(query)?;
        let conversation_id = conversation_id.trim();
        if conversation_id.is_empty() {
            return Err(ChatError::InvalidRequest(
                "conversationId is required".to_string(),
            ));
        }

        let mut messages = self.store.read_all(conversation_id).await?;
        let message = ChatMessage::user(query);
        self.store.append(conversation_id, message.clone()).await?;
        messages.push(message);
        debug!(conversation_id = %conversation_id, messages = messages.len(), "continuing conversation");

        let request = ChatCompletionRequest::streaming(self.model.clone(), messages);
        self.open(conversation_id, request).await
    }

    /// Stored turns of a conversation in order
    pub async fn history(&self, conversation_id: &str) -> Result<Vec<ChatMessage>, ChatError> {
        Ok(self.store.read_all(conversation_id.trim()).await?)
    }

    async fn open(
        &self,
        conversation_id: &str,
        request: ChatCompletionRequest,
    ) -> Result<RelayStream, ChatError> {
        Ok(self
            .relay
            .relay_with_cancel(conversation_id, request, self.shutdown.child_token())
            .await?)
    }
}

fn require_query(query: &str) -> Result<&str, ChatError> {
    let query = query.trim();
    if query.is_empty() {
        return Err(ChatError::InvalidRequest("query must not be empty".to_string()));
    }
    Ok(query)
}
