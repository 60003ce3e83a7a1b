//! Error types for the LLM layer

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when talking to a chat completion provider
#[derive(Debug, Error)]
pub enum LlmError {
    /// The provider answered with a non-success status
    #[error("HTTP error (status {status}): {body}")]
    HttpError { status: u16, body: String },

    /// The request never produced a response (DNS, TLS, refused connection)
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The request or body read exceeded its deadline
    #[error("Request timed out: {0}")]
    TimeoutError(String),

    /// SSE stream decoding failures
    #[error("Stream error: {0}")]
    StreamError(String),

    /// JSON encoding/decoding issues
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Invalid request parameters
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded (retry after {retry_after:?})")]
    RateLimitExceeded { retry_after: Option<Duration> },
}

impl From<serde_json::Error> for LlmError {
    fn from(err: serde_json::Error) -> Self {
        LlmError::SerializationError(err.to_string())
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::TimeoutError(err.to_string())
        } else if let Some(status) = err.status() {
            LlmError::HttpError {
                status: status.as_u16(),
                body: err.to_string(),
            }
        } else if err.is_decode() {
            LlmError::SerializationError(err.to_string())
        } else if err.is_body() {
            LlmError::StreamError(err.to_string())
        } else {
            LlmError::ConnectionError(err.to_string())
        }
    }
}
