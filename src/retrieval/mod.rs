//! Context retrieval for first questions
//!
//! A question is turned into a list of component names by the model, and
//! each name is looked up in a vector index of the component documentation.

pub mod prompt;
pub mod weaviate;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use crate::llm::{ChatCompletionRequest, ChatMessage, ChatProvider, LlmError};

pub use weaviate::{WeaviateConfig, WeaviateIndex};

/// Errors from the retrieval layer
#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("Vector index request failed: {0}")]
    RequestError(String),

    #[error("Vector index returned HTTP {status}: {body}")]
    HttpError { status: u16, body: String },

    #[error("Malformed vector index response: {0}")]
    MalformedResponse(String),

    #[error("Concept extraction failed: {0}")]
    ExtractionError(#[from] LlmError),
}

impl From<reqwest::Error> for RetrievalError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            RetrievalError::MalformedResponse(err.to_string())
        } else {
            RetrievalError::RequestError(err.to_string())
        }
    }
}

/// Source of documentation snippets for a question
#[async_trait]
pub trait Retriever: Send + Sync {
    async fn retrieve(&self, query: &str) -> Result<Vec<String>, RetrievalError>;
}

/// Similarity search over stored documents
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Contents of the documents nearest to `concepts`, closest first
    async fn near_text(&self, concepts: &[String]) -> Result<Vec<String>, RetrievalError>;
}

/// Concept extraction followed by one nearest-document lookup per concept
pub struct RetrievalPipeline {
    provider: Arc<dyn ChatProvider>,
    index: Arc<dyn VectorIndex>,
    model: String,
}

impl RetrievalPipeline {
    pub fn new(
        provider: Arc<dyn ChatProvider>,
        index: Arc<dyn VectorIndex>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            index,
            model: model.into(),
        }
    }

    /// Ask the model which components the question refers to
    ///
    /// Failures and unparsable answers yield no concepts.
    pub async fn extract_concepts(&self, query: &str) -> Vec<String> {
        let request = ChatCompletionRequest::blocking(
            self.model.clone(),
            vec![ChatMessage::user(prompt::concept_prompt(query))],
        )
        .with_temperature(0.0);

        let answer = match self.provider.complete(request).await {
            Ok(answer) => answer,
            Err(e) => {
                warn!(error = %e, "concept extraction failed");
                return Vec::new();
            }
        };

        match prompt::parse_concepts(&answer) {
            Some(concepts) => {
                debug!(?concepts, "extracted concepts");
                concepts
            }
            None => {
                warn!(answer = %answer, "concept extraction answer is not a JSON string array");
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl Retriever for RetrievalPipeline {
    async fn retrieve(&self, query: &str) -> Result<Vec<String>, RetrievalError> {
        let concepts = self.extract_concepts(query).await;

        let mut snippets = Vec::with_capacity(concepts.len());
        for concept in concepts {
            match self.index.near_text(std::slice::from_ref(&concept)).await {
                Ok(results) => match results.into_iter().next() {
                    Some(snippet) => snippets.push(snippet),
                    None => debug!(concept = %concept, "no document for concept"),
                },
                Err(e) => warn!(concept = %concept, error = %e, "vector search failed"),
            }
        }

        Ok(snippets)
    }
}
