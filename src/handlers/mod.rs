// Handlers module

pub mod chat;
pub mod get_conversation;
pub mod query;

pub use chat::chat_handler;
pub use get_conversation::get_conversation_handler;
pub use query::query_handler;

use tracing::{error, warn};
use warp::http::StatusCode;
use warp::reply::Response;
use warp::Reply;

use crate::conversation::{ChatError, ChatService};
use crate::llm::LlmError;
use crate::models::ErrorBody;
use crate::relay::RelayError;
use crate::store::StoreError;

/// Response header naming the conversation a first question was filed under
pub const CONVERSATION_ID_HEADER: &str = "x-conversation-id";

/// Shared state handed to every handler
pub struct AppState {
    pub chat: ChatService,
}

/// HTTP status and error code for a failed request
pub fn error_status(err: &ChatError) -> (StatusCode, &'static str) {
    match err {
        ChatError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "invalid_request"),
        ChatError::Relay(relay) => {
            let status = match relay {
                RelayError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
                RelayError::Upstream(LlmError::InvalidRequest(_)) => StatusCode::BAD_REQUEST,
                RelayError::Upstream(LlmError::TimeoutError(_)) => StatusCode::GATEWAY_TIMEOUT,
                RelayError::Upstream(_) | RelayError::Framing(_) => StatusCode::BAD_GATEWAY,
                RelayError::Stalled(_) => StatusCode::GATEWAY_TIMEOUT,
                RelayError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
            };
            (status, relay.code())
        }
        ChatError::Store(StoreError::ValidationError(_)) => {
            (StatusCode::BAD_REQUEST, "invalid_request")
        }
        ChatError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "store_error"),
        ChatError::Retrieval(_) => (StatusCode::BAD_GATEWAY, "retrieval_error"),
    }
}

/// JSON error response for a request that failed before streaming began
pub fn error_reply(err: &ChatError) -> Response {
    let (status, code) = error_status(err);
    if status.is_server_error() {
        error!(code, error = %err, "request failed");
    } else {
        warn!(code, error = %err, "request rejected");
    }

    warp::reply::with_status(
        warp::reply::json(&ErrorBody::new(code, err.to_string())),
        status,
    )
    .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_error_status_mapping() {
        let cases = vec![
            (ChatError::InvalidRequest("empty".to_string()), StatusCode::BAD_REQUEST, "invalid_request"),
            (
                ChatError::Relay(RelayError::Upstream(LlmError::HttpError {
                    status: 500,
                    body: String::new(),
                })),
                StatusCode::BAD_GATEWAY,
                "upstream_status",
            ),
            (
                ChatError::Relay(RelayError::Upstream(LlmError::RateLimitExceeded { retry_after: None })),
                StatusCode::BAD_GATEWAY,
                "rate_limited",
            ),
            (
                ChatError::Relay(RelayError::Stalled(Duration::from_secs(30))),
                StatusCode::GATEWAY_TIMEOUT,
                "stalled",
            ),
            (
                ChatError::Store(StoreError::ConnectionError("down".to_string())),
                StatusCode::INTERNAL_SERVER_ERROR,
                "store_error",
            ),
            (
                ChatError::Store(StoreError::ValidationError("empty id".to_string())),
                StatusCode::BAD_REQUEST,
                "invalid_request",
            ),
        ];

        for (err, status, code) in cases {
            assert_eq!(error_status(&err), (status, code), "{}", err);
        }
    }

    #[test]
    fn test_error_reply_status() {
        let response = error_reply(&ChatError::InvalidRequest("query must not be empty".to_string()));
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
