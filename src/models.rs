// Request and response bodies of the HTTP API

use serde::{Deserialize, Serialize};

use crate::llm::ChatMessage;

// Request Types
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    pub query: String,
    #[serde(default)]
    pub conversation_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub query: String,
    pub conversation_id: String,
}

// Conversation Response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationResponse {
    pub conversation_id: String,
    pub messages: Vec<ChatMessage>,
}

// Error Types
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

impl ErrorBody {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_query_request_deserialization() {
        let request: QueryRequest =
            serde_json::from_str(r#"{"query":"What is SfButton?","conversationId":"abc"}"#).unwrap();
        assert_eq!(request.query, "What is SfButton?");
        assert_eq!(request.conversation_id.as_deref(), Some("abc"));

        let request: QueryRequest = serde_json::from_str(r#"{"query":"hi"}"#).unwrap();
        assert!(request.conversation_id.is_none());
    }

    #[test]
    fn test_chat_request_requires_conversation_id() {
        assert!(serde_json::from_str::<ChatRequest>(r#"{"query":"hi"}"#).is_err());

        let request: ChatRequest =
            serde_json::from_str(r#"{"query":"more","conversationId":"abc"}"#).unwrap();
        assert_eq!(request.conversation_id, "abc");
    }

    #[test]
    fn test_conversation_response_serialization() {
        let response = ConversationResponse {
            conversation_id: "abc".to_string(),
            messages: vec![ChatMessage::user("hi"), ChatMessage::system("hello")],
        };
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(
            value,
            json!({
                "conversationId": "abc",
                "messages": [
                    {"role": "user", "content": "hi"},
                    {"role": "system", "content": "hello"}
                ]
            })
        );
    }

    #[test]
    fn test_error_body_serialization() {
        let value = serde_json::to_value(ErrorBody::new("stalled", "no data for 60s")).unwrap();
        assert_eq!(value, json!({"error": {"code": "stalled", "message": "no data for 60s"}}));
    }
}
