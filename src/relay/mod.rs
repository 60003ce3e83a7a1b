//! Incremental token-stream relay
//!
//! Bridges a streaming chat completion (SSE framed, chunked arbitrarily by
//! the network) to a caller that wants plain text:
//!
//! - raw bytes are decoded as UTF-8 and fed to a persistent SSE parser
//! - each data event is classified as a text delta or the `[DONE]` terminator
//! - newline-only deltas among the first two emissions are dropped
//! - forwarded deltas are accumulated, and on `[DONE]` the accumulated text
//!   is appended to the conversation as one system message before the
//!   output stream ends
//!
//! The output is pull-driven: nothing is read from the provider unless the
//! caller is polling. Dropping the output stream (or cancelling its token)
//! releases the upstream connection and persists nothing.

mod error;
mod state;

pub use error::RelayError;
pub use state::{is_priming_artifact, StreamState, PRIMING_WINDOW};

use async_stream::stream;
use bytes::Bytes;
use futures::stream::Stream;
use futures::StreamExt;
use pin_utils::pin_mut;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::llm::openai::{parse_completion_event, CompletionEvent, SseParser, Utf8Decoder};
use crate::llm::{ChatCompletionRequest, ChatMessage, ChatProvider, LlmError};
use crate::store::ConversationStore;

/// Text chunks in the order they were decoded; ends cleanly after `[DONE]`
/// or with exactly one error
pub type RelayStream = Pin<Box<dyn Stream<Item = Result<Bytes, RelayError>> + Send>>;

/// Deadlines for a stalled provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayTimeouts {
    /// Wait for the response headers, and again for the first body chunk
    pub first_byte: Duration,
    /// Wait between later body chunks
    pub idle: Duration,
}

impl Default for RelayTimeouts {
    fn default() -> Self {
        Self {
            first_byte: Duration::from_secs(30),
            idle: Duration::from_secs(60),
        }
    }
}

/// Relays completion streams and records the finished answers
#[derive(Clone)]
pub struct StreamRelay {
    provider: Arc<dyn ChatProvider>,
    store: Arc<dyn ConversationStore>,
    timeouts: RelayTimeouts,
}

impl StreamRelay {
    /// Create a relay with default timeouts
    pub fn new(provider: Arc<dyn ChatProvider>, store: Arc<dyn ConversationStore>) -> Self {
        Self {
            provider,
            store,
            timeouts: RelayTimeouts::default(),
        }
    }

    /// Set the stall timeouts
    pub fn with_timeouts(mut self, timeouts: RelayTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Open a streaming completion and relay it
    ///
    /// # Errors
    ///
    /// Fails before any output if the request is invalid, the provider
    /// cannot be reached, or it answers with a non-success status.
    pub async fn relay(
        &self,
        conversation_id: &str,
        request: ChatCompletionRequest,
    ) -> Result<RelayStream, RelayError> {
        self.relay_with_cancel(conversation_id, request, CancellationToken::new())
            .await
    }

    /// Like [`relay`](Self::relay), but stops as soon as `cancel` fires
    ///
    /// A cancelled stream yields a single `RelayError::Cancelled` and ends.
    pub async fn relay_with_cancel(
        &self,
        conversation_id: &str,
        request: ChatCompletionRequest,
        cancel: CancellationToken,
    ) -> Result<RelayStream, RelayError> {
        if conversation_id.trim().is_empty() {
            return Err(RelayError::InvalidRequest(
                "conversation id must not be empty".to_string(),
            ));
        }
        if !request.stream {
            return Err(RelayError::InvalidRequest(
                "payload must request stream mode".to_string(),
            ));
        }

        let message_count = request.messages.len();
        let first_byte = self.timeouts.first_byte;

        let upstream = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(RelayError::Cancelled),
            opened = timeout(first_byte, self.provider.stream_chat(request)) => match opened {
                Ok(result) => result?,
                Err(_) => {
                    warn!(conversation_id = %conversation_id, ?first_byte, "provider did not answer in time");
                    return Err(RelayError::Stalled(first_byte));
                }
            },
        };

        info!(conversation_id = %conversation_id, messages = message_count, "relaying completion stream");

        Ok(Box::pin(relay_events(
            conversation_id.to_string(),
            upstream,
            self.store.clone(),
            self.timeouts,
            cancel,
        )))
    }
}

/// Drive the decode loop over an already-open response body
pub fn relay_events<S>(
    conversation_id: String,
    upstream: S,
    store: Arc<dyn ConversationStore>,
    timeouts: RelayTimeouts,
    cancel: CancellationToken,
) -> impl Stream<Item = Result<Bytes, RelayError>> + Send
where
    S: Stream<Item = Result<Bytes, LlmError>> + Send + 'static,
{
    stream! {
        pin_mut!(upstream);

        let mut decoder = Utf8Decoder::default();
        let mut parser = SseParser::new();
        let mut state = StreamState::new();
        let mut window = timeouts.first_byte;

        loop {
            let polled = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                next = timeout(window, upstream.next()) => Some(next),
            };

            let chunk = match polled {
                None => {
                    debug!(conversation_id = %conversation_id, emitted = state.emitted(), "stream cancelled by caller");
                    yield Err(RelayError::Cancelled);
                    return;
                }
                Some(Err(_)) => {
                    warn!(conversation_id = %conversation_id, ?window, "upstream stalled");
                    yield Err(RelayError::Stalled(window));
                    return;
                }
                Some(Ok(None)) => {
                    warn!(
                        conversation_id = %conversation_id,
                        partial_event = parser.has_partial_event(),
                        partial_code_point = decoder.has_pending(),
                        "upstream closed before [DONE]"
                    );
                    yield Err(RelayError::Framing(
                        "upstream closed the stream before [DONE]".to_string(),
                    ));
                    return;
                }
                Some(Ok(Some(Err(e)))) => {
                    warn!(conversation_id = %conversation_id, error = %e, "upstream read failed");
                    yield Err(RelayError::Upstream(e));
                    return;
                }
                Some(Ok(Some(Ok(bytes)))) => bytes,
            };
            window = timeouts.idle;

            let text = match decoder.decode(&chunk) {
                Ok(text) => text,
                Err(e) => {
                    warn!(conversation_id = %conversation_id, error = %e, "undecodable upstream bytes");
                    yield Err(RelayError::Framing(e.to_string()));
                    return;
                }
            };

            for event in parser.feed(&text) {
                // One read can carry several events; none of them may be
                // forwarded or persisted once the caller has cancelled
                if cancel.is_cancelled() {
                    debug!(conversation_id = %conversation_id, emitted = state.emitted(), "stream cancelled by caller");
                    yield Err(RelayError::Cancelled);
                    return;
                }

                match parse_completion_event(&event.data) {
                    Ok(CompletionEvent::Delta(delta)) => {
                        if let Some(text) = state.admit(delta) {
                            yield Ok(Bytes::from(text));
                        } else {
                            debug!(conversation_id = %conversation_id, "suppressed priming artifact");
                        }
                    }
                    Ok(CompletionEvent::Done) => {
                        let finished = std::mem::take(&mut state);
                        info!(conversation_id = %conversation_id, emitted = finished.emitted(), "completion stream finished");
                        let persisted = persist_completion(store.clone(), conversation_id.clone(), finished.into_message());
                        // End of stream waits for the append; a consumer that
                        // drops us here leaves the task running detached
                        if let Err(e) = persisted.await {
                            error!(conversation_id = %conversation_id, error = %e, "persist task did not complete");
                        }
                        return;
                    }
                    Err(e) => {
                        warn!(conversation_id = %conversation_id, error = %e, "malformed completion event");
                        yield Err(RelayError::Framing(e.to_string()));
                        return;
                    }
                }
            }
        }
    }
}

/// Append the finished answer on its own task
///
/// Failures are logged and never reach the caller's stream.
fn persist_completion(
    store: Arc<dyn ConversationStore>,
    conversation_id: String,
    message: ChatMessage,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let length = message.content.len();
        match store.append(&conversation_id, message).await {
            Ok(()) => {
                debug!(conversation_id = %conversation_id, length, "persisted completed message")
            }
            Err(e) => {
                error!(conversation_id = %conversation_id, error = %e, "failed to persist completed message")
            }
        }
    })
}
