use std::time::Duration;
use thiserror::Error;

use crate::llm::LlmError;

/// Errors surfaced by the stream relay
///
/// Anything other than `Cancelled` is fatal for the stream it occurs on, and
/// no partial message is persisted.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Rejected before contacting the provider
    #[error("Invalid relay request: {0}")]
    InvalidRequest(String),

    /// The provider could not be reached, refused the request, or dropped
    /// the connection mid-stream
    #[error("Upstream error: {0}")]
    Upstream(#[from] LlmError),

    /// Bytes that do not decode into well-formed completion events
    #[error("Framing error: {0}")]
    Framing(String),

    /// No bytes arrived within the allowed window
    #[error("Upstream stalled: no data for {0:?}")]
    Stalled(Duration),

    /// The caller cancelled the stream
    #[error("Stream cancelled")]
    Cancelled,
}

impl RelayError {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            RelayError::InvalidRequest(_) => "invalid_request",
            RelayError::Upstream(LlmError::HttpError { .. }) => "upstream_status",
            RelayError::Upstream(LlmError::RateLimitExceeded { .. }) => "rate_limited",
            RelayError::Upstream(LlmError::InvalidRequest(_)) => "invalid_request",
            RelayError::Upstream(_) => "upstream_unavailable",
            RelayError::Framing(_) => "framing",
            RelayError::Stalled(_) => "stalled",
            RelayError::Cancelled => "cancelled",
        }
    }
}
