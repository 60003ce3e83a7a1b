//! Core types for the chat completion layer

use serde::{Deserialize, Serialize};

/// Role of a message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// Human input
    User,
    /// Instructions and model output
    System,
}

/// A single turn in a conversation
///
/// Messages are immutable once created: the caller produces user turns and
/// the relay produces the system turn when a stream completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }
}

/// JSON body sent to the chat completions endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionRequest {
    /// Model identifier (e.g. "gpt-3.5-turbo")
    pub model: String,
    /// Full ordered message list
    pub messages: Vec<ChatMessage>,
    /// Whether the provider should answer with an event stream
    pub stream: bool,
    /// Sampling temperature; the provider default when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl ChatCompletionRequest {
    /// Create a streaming request
    pub fn streaming(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            stream: true,
            temperature: None,
        }
    }

    /// Create a request answered with a single JSON document
    pub fn blocking(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            stream: false,
            temperature: None,
        }
    }

    /// Set the sampling temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_role_serialization() {
        assert_eq!(serde_json::to_string(&ChatRole::User).unwrap(), r#""user""#);
        assert_eq!(serde_json::to_string(&ChatRole::System).unwrap(), r#""system""#);
    }

    #[test]
    fn test_streaming_request_body() {
        let request = ChatCompletionRequest::streaming(
            "gpt-3.5-turbo",
            vec![ChatMessage::system("Be brief."), ChatMessage::user("Hi")],
        );

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({
                "model": "gpt-3.5-turbo",
                "messages": [
                    {"role": "system", "content": "Be brief."},
                    {"role": "user", "content": "Hi"}
                ],
                "stream": true
            })
        );
    }

    #[test]
    fn test_blocking_request_disables_stream() {
        let request = ChatCompletionRequest::blocking("gpt-3.5-turbo", vec![]);
        assert!(!request.stream);
    }

    #[test]
    fn test_temperature_only_serialized_when_set() {
        let request = ChatCompletionRequest::blocking("gpt-3.5-turbo", vec![]).with_temperature(0.0);
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["temperature"], json!(0.0));

        let value = serde_json::to_value(ChatCompletionRequest::blocking("m", vec![])).unwrap();
        assert!(value.get("temperature").is_none());
    }

    #[test]
    fn test_message_deserialization() {
        let message: ChatMessage =
            serde_json::from_str(r#"{"role":"system","content":"Answer"}"#).unwrap();
        assert_eq!(message, ChatMessage::system("Answer"));
    }
}
