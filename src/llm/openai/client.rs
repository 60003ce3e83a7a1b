//! OpenAI chat completions client

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, Response, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::llm::core::{
    config::OpenAiConfig,
    error::LlmError,
    provider::{ByteStream, ChatProvider},
    types::ChatCompletionRequest,
};

use super::types::extract_message;

/// Client for an OpenAI-compatible chat completions endpoint
pub struct OpenAiClient {
    /// HTTP client for making requests
    http_client: Client,
    /// Endpoint, credentials and model
    config: OpenAiConfig,
}

impl OpenAiClient {
    /// Create a new client
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: OpenAiConfig) -> Result<Self, LlmError> {
        let http_client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| LlmError::ConnectionError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            config,
        })
    }

    /// Model configured for this client
    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// POST the request and fail on any non-success status
    async fn post(&self, request: &ChatCompletionRequest) -> Result<Response, LlmError> {
        let url = self.config.completions_url();
        debug!(url = %url, model = %request.model, stream = request.stream, "sending completion request");

        let response = self
            .http_client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(LlmError::RateLimitExceeded {
                retry_after: retry_after(response.headers()),
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::HttpError {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response)
    }
}

/// `Retry-After` given in seconds
fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

#[async_trait]
impl ChatProvider for OpenAiClient {
    async fn stream_chat(&self, request: ChatCompletionRequest) -> Result<ByteStream, LlmError> {
        if !request.stream {
            return Err(LlmError::InvalidRequest(
                "stream_chat requires a streaming request".to_string(),
            ));
        }

        let response = self.post(&request).await?;
        let byte_stream = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(LlmError::from));

        Ok(Box::pin(byte_stream))
    }

    async fn complete(&self, mut request: ChatCompletionRequest) -> Result<String, LlmError> {
        request.stream = false;

        let response = self.post(&request).await?;
        let body: Value = response.json().await?;

        extract_message(&body).map(str::to_string).ok_or_else(|| {
            LlmError::SerializationError(format!("Completion response has no message content: {}", body))
        })
    }
}
