//! OpenAI provider implementation
//!
//! Speaks the `/v1/chat/completions` API, streaming (`text/event-stream`) and
//! non-streaming.

pub mod client;
pub mod sse;
pub mod types;

// Re-export commonly used types
pub use client::OpenAiClient;
pub use sse::{SseEvent, SseParser, Utf8Decoder};
pub use types::{parse_completion_event, CompletionEvent, DONE_SENTINEL};
