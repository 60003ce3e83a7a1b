//! Scripted in-process provider
//!
//! Answers requests from a queue of pre-configured responses, which makes
//! the relay deterministic in tests: chunk boundaries, stalls and failures
//! are all under the caller's control.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream;
use futures::StreamExt;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::llm::core::{
    error::LlmError,
    provider::{ByteStream, ChatProvider},
    types::ChatCompletionRequest,
};

/// Provider that replays queued responses in order
#[derive(Default)]
pub struct MockProvider {
    streams: Mutex<VecDeque<Result<ByteStream, LlmError>>>,
    completions: Mutex<VecDeque<Result<String, LlmError>>>,
    requests: Mutex<Vec<ChatCompletionRequest>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockProvider {
    /// Create a provider with nothing queued
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a stream that yields each chunk as one network read, then ends
    pub fn with_stream<I, S>(self, chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Bytes>,
    {
        let chunks: Vec<Result<Bytes, LlmError>> = chunks.into_iter().map(|c| Ok(c.into())).collect();
        self.with_byte_stream(Box::pin(stream::iter(chunks)))
    }

    /// Queue a stream that yields the chunks and then never produces another byte
    pub fn with_stalling_stream<I, S>(self, chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Bytes>,
    {
        let chunks: Vec<Result<Bytes, LlmError>> = chunks.into_iter().map(|c| Ok(c.into())).collect();
        self.with_byte_stream(Box::pin(stream::iter(chunks).chain(stream::pending())))
    }

    /// Queue a stream fed by the returned sender
    ///
    /// The stream stays open until the sender is dropped.
    pub fn with_channel_stream(self) -> (Self, mpsc::Sender<Result<Bytes, LlmError>>) {
        let (tx, rx) = mpsc::channel(16);
        (self.with_byte_stream(Box::pin(ReceiverStream::new(rx))), tx)
    }

    /// Queue an arbitrary body stream
    pub fn with_byte_stream(self, byte_stream: ByteStream) -> Self {
        lock(&self.streams).push_back(Ok(byte_stream));
        self
    }

    /// Queue a failure of the streaming request itself
    pub fn with_stream_error(self, error: LlmError) -> Self {
        lock(&self.streams).push_back(Err(error));
        self
    }

    /// Queue the text of a non-streaming completion
    pub fn with_completion(self, text: impl Into<String>) -> Self {
        lock(&self.completions).push_back(Ok(text.into()));
        self
    }

    /// Queue a failed non-streaming completion
    pub fn with_completion_error(self, error: LlmError) -> Self {
        lock(&self.completions).push_back(Err(error));
        self
    }

    /// Every request received so far, streaming or not
    pub fn requests(&self) -> Vec<ChatCompletionRequest> {
        lock(&self.requests).clone()
    }
}

#[async_trait]
impl ChatProvider for MockProvider {
    async fn stream_chat(&self, request: ChatCompletionRequest) -> Result<ByteStream, LlmError> {
        lock(&self.requests).push(request);
        lock(&self.streams).pop_front().unwrap_or_else(|| {
            Err(LlmError::InvalidRequest(
                "MockProvider has no queued stream".to_string(),
            ))
        })
    }

    async fn complete(&self, request: ChatCompletionRequest) -> Result<String, LlmError> {
        lock(&self.requests).push(request);
        lock(&self.completions).pop_front().unwrap_or_else(|| {
            Err(LlmError::InvalidRequest(
                "MockProvider has no queued completion".to_string(),
            ))
        })
    }
}

/// One SSE data event carrying `delta` at `choices[0].delta.content`
pub fn completion_chunk(delta: &str) -> String {
    let payload = json!({
        "object": "chat.completion.chunk",
        "choices": [{"index": 0, "delta": {"content": delta}}]
    });
    format!("data: {}\n\n", payload)
}

/// The SSE terminator event
pub fn done_chunk() -> String {
    "data: [DONE]\n\n".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::core::types::ChatMessage;

    #[tokio::test]
    async fn test_replays_streams_in_order() {
        let provider = MockProvider::new()
            .with_stream(vec!["a"])
            .with_stream_error(LlmError::HttpError {
                status: 500,
                body: String::new(),
            });

        let request = ChatCompletionRequest::streaming("m", vec![ChatMessage::user("hi")]);
        let mut first = provider.stream_chat(request.clone()).await.unwrap();
        assert_eq!(first.next().await.unwrap().unwrap(), Bytes::from("a"));
        assert!(first.next().await.is_none());

        assert!(provider.stream_chat(request.clone()).await.is_err());
        assert!(provider.stream_chat(request).await.is_err());
        assert_eq!(provider.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_replays_completions() {
        let provider = MockProvider::new().with_completion("[\"Button\"]");
        let request = ChatCompletionRequest::blocking("m", vec![]);
        assert_eq!(provider.complete(request).await.unwrap(), "[\"Button\"]");
    }

    #[test]
    fn test_completion_chunk_format() {
        let chunk = completion_chunk("Hi");
        assert!(chunk.starts_with("data: {"));
        assert!(chunk.ends_with("}\n\n"));
        assert!(chunk.contains(r#""content":"Hi""#));
    }
}
