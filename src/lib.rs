// HTTP Server modules
pub mod body;
pub mod handlers;
pub mod models;
pub mod routes;

// Chat flows and their building blocks
pub mod config;
pub mod conversation;
pub mod relay;
pub mod retrieval;
pub mod store;

// LLM abstraction layer
pub mod llm;
