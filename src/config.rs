//! Server configuration read from the environment

use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

use crate::llm::core::config::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use crate::llm::OpenAiConfig;
use crate::relay::RelayTimeouts;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} environment variable not set")]
    Missing(&'static str),

    #[error("{name} has an invalid value {value:?}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// Message DB settings, present when `MESSAGE_DB_URL` is set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageDbSettings {
    pub url: String,
    pub schema: String,
    pub pool_size: usize,
}

/// Weaviate settings, present when `WEAVIATE_CLUSTER` is set
#[derive(Clone, PartialEq, Eq)]
pub struct WeaviateSettings {
    pub cluster: String,
    pub api_key: String,
}

impl std::fmt::Debug for WeaviateSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeaviateSettings")
            .field("cluster", &self.cluster)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub openai: OpenAiConfig,
    pub timeouts: RelayTimeouts,
    pub bind_addr: SocketAddr,
    pub message_db: Option<MessageDbSettings>,
    pub weaviate: Option<WeaviateSettings>,
}

impl AppConfig {
    /// Read the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Blank values count as unset
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let api_key = get("OPENAI_API_KEY").ok_or(ConfigError::Missing("OPENAI_API_KEY"))?;
        let openai = OpenAiConfig::new(api_key)
            .with_base_url(get("OPENAI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()))
            .with_model(get("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()))
            .with_connect_timeout(seconds(
                "OPENAI_CONNECT_TIMEOUT_SECS",
                get("OPENAI_CONNECT_TIMEOUT_SECS"),
                5,
            )?);

        let timeouts = RelayTimeouts {
            first_byte: seconds(
                "RELAY_FIRST_BYTE_TIMEOUT_SECS",
                get("RELAY_FIRST_BYTE_TIMEOUT_SECS"),
                30,
            )?,
            idle: seconds("RELAY_IDLE_TIMEOUT_SECS", get("RELAY_IDLE_TIMEOUT_SECS"), 60)?,
        };

        let bind_addr = match get("BIND_ADDR") {
            Some(value) => value.parse::<SocketAddr>().map_err(|e| ConfigError::Invalid {
                name: "BIND_ADDR",
                value: value.clone(),
                reason: e.to_string(),
            })?,
            None => SocketAddr::from(([127, 0, 0, 1], 3030)),
        };

        let message_db = match get("MESSAGE_DB_URL") {
            Some(url) => Some(MessageDbSettings {
                url,
                schema: get("MESSAGE_DB_SCHEMA").unwrap_or_else(|| "message_store".to_string()),
                pool_size: number("MESSAGE_DB_POOL_SIZE", get("MESSAGE_DB_POOL_SIZE"), 16)?,
            }),
            None => None,
        };

        let weaviate = get("WEAVIATE_CLUSTER").map(|cluster| WeaviateSettings {
            cluster,
            api_key: get("WEAVIATE_API_KEY").unwrap_or_default(),
        });

        Ok(Self {
            openai,
            timeouts,
            bind_addr,
            message_db,
            weaviate,
        })
    }
}

fn number<T>(name: &'static str, value: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialOrd + Default,
    T::Err: std::fmt::Display,
{
    let Some(value) = value else {
        return Ok(default);
    };
    let parsed = value.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
        name,
        value: value.clone(),
        reason: e.to_string(),
    })?;
    if parsed <= T::default() {
        return Err(ConfigError::Invalid {
            name,
            value,
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(parsed)
}

fn seconds(name: &'static str, value: Option<String>, default: u64) -> Result<Duration, ConfigError> {
    number(name, value, default).map(Duration::from_secs)
}
