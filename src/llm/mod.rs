//! LLM Abstraction Layer
//!
//! This module provides the interface to a hosted chat completion API:
//! request/message types, the provider trait, and the OpenAI streaming client.

pub mod core;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;
pub mod openai;

// Re-export commonly used types
pub use core::{
    config::OpenAiConfig,
    error::LlmError,
    provider::{ByteStream, ChatProvider},
    types::{ChatCompletionRequest, ChatMessage, ChatRole},
};

#[cfg(any(test, feature = "test-util"))]
pub use mock::MockProvider;
pub use openai::OpenAiClient;
