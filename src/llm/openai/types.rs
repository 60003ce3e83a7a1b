//! Wire-level payloads of the chat completions API

use serde_json::Value;

use crate::llm::core::error::LlmError;

/// Literal payload of the event that terminates a completion stream
pub const DONE_SENTINEL: &str = "[DONE]";

/// Meaning of one decoded SSE data payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionEvent {
    /// Incremental text; empty when the chunk carried no content
    Delta(String),
    /// The `[DONE]` terminator
    Done,
}

/// Classify the data payload of one SSE event
///
/// # Errors
/// Returns `LlmError::SerializationError` if the payload is neither the
/// terminator nor valid JSON.
pub fn parse_completion_event(data: &str) -> Result<CompletionEvent, LlmError> {
    if data == DONE_SENTINEL {
        return Ok(CompletionEvent::Done);
    }

    let chunk: Value = serde_json::from_str(data).map_err(|e| {
        LlmError::SerializationError(format!(
            "Failed to parse completion chunk: {}. Data: {}",
            e, data
        ))
    })?;

    Ok(CompletionEvent::Delta(extract_delta(&chunk).to_string()))
}

/// Text delta at `choices[0].delta.content`, or `""` when the path is absent
pub fn extract_delta(chunk: &Value) -> &str {
    chunk
        .pointer("/choices/0/delta/content")
        .and_then(Value::as_str)
        .unwrap_or("")
}

/// Message text of a non-streaming response at `choices[0].message.content`
pub fn extract_message(response: &Value) -> Option<&str> {
    response
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
}
