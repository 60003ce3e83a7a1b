//! Provider trait for chat completion backends

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::Stream;
use std::pin::Pin;

use super::{error::LlmError, types::ChatCompletionRequest};

/// Raw response body of a streaming completion, chunked however the network
/// delivered it
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, LlmError>> + Send>>;

/// Interface that chat completion backends must satisfy
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Open a streaming completion
    ///
    /// Resolves once the provider has accepted the request. The returned
    /// stream yields the undecoded `text/event-stream` body; dropping it
    /// releases the underlying connection.
    ///
    /// # Errors
    /// Returns an error if the request cannot be sent or the provider answers
    /// with a non-success status.
    async fn stream_chat(&self, request: ChatCompletionRequest) -> Result<ByteStream, LlmError>;

    /// Run a non-streaming completion and return the generated text
    async fn complete(&self, request: ChatCompletionRequest) -> Result<String, LlmError>;
}
