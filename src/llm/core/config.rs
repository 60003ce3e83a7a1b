//! Provider connection settings

use std::time::Duration;

/// Default public endpoint for the chat completions API
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// Default model used for both streaming answers and concept extraction
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

/// Credentials and endpoint for an OpenAI-compatible provider
///
/// Passed to the client at construction so nothing downstream reads the
/// process environment.
#[derive(Clone)]
pub struct OpenAiConfig {
    /// Bearer token sent with every request
    pub api_key: String,
    /// Scheme + host, without the `/v1/...` path
    pub base_url: String,
    /// Model identifier
    pub model: String,
    /// TCP/TLS connect deadline
    pub connect_timeout: Duration,
}

impl OpenAiConfig {
    /// Create a configuration for the public endpoint and default model
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            connect_timeout: Duration::from_secs(5),
        }
    }

    /// Set the base URL
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the model
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the connect timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Full URL of the chat completions endpoint
    pub fn completions_url(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

// Keep the key out of logs.
impl std::fmt::Debug for OpenAiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}
