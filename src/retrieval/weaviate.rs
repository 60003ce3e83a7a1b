//! Weaviate nearText search over the component documentation index

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;

use super::{RetrievalError, VectorIndex};

/// Connection settings for a Weaviate cluster
#[derive(Clone)]
pub struct WeaviateConfig {
    /// Base URL, e.g. `https://my-cluster.weaviate.network`
    pub base_url: String,
    pub api_key: String,
    /// Forwarded to Weaviate's text2vec-openai module
    pub openai_api_key: String,
}

impl WeaviateConfig {
    /// Settings for a cluster host reached over HTTPS
    pub fn for_cluster(
        cluster: &str,
        api_key: impl Into<String>,
        openai_api_key: impl Into<String>,
    ) -> Self {
        Self {
            base_url: format!("https://{}", cluster.trim_end_matches('/')),
            api_key: api_key.into(),
            openai_api_key: openai_api_key.into(),
        }
    }

    /// Replace the base URL (builder pattern)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn graphql_url(&self) -> String {
        format!("{}/v1/graphql", self.base_url.trim_end_matches('/'))
    }
}

impl std::fmt::Debug for WeaviateConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeaviateConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("openai_api_key", &"<redacted>")
            .finish()
    }
}

/// `Article` class search over GraphQL
pub struct WeaviateIndex {
    http_client: Client,
    config: WeaviateConfig,
}

impl WeaviateIndex {
    pub fn new(config: WeaviateConfig) -> Self {
        Self {
            http_client: Client::new(),
            config,
        }
    }
}

/// GraphQL `Get` for the articles nearest to `concepts`
///
/// Two extra results are requested beyond one per concept.
pub fn build_near_text_query(concepts: &[String]) -> String {
    format!(
        "{{ Get {{ Article(nearText: {{ concepts: {} }}, limit: {}) {{ content }} }} }}",
        Value::from(concepts.to_vec()),
        concepts.len() + 2
    )
}

/// Pull `data.Get.Article[*].content` out of a GraphQL response
fn article_contents(body: &Value) -> Result<Vec<String>, RetrievalError> {
    if let Some(errors) = body.get("errors") {
        return Err(RetrievalError::MalformedResponse(format!(
            "GraphQL errors: {}",
            errors
        )));
    }

    let articles = body
        .pointer("/data/Get/Article")
        .and_then(Value::as_array)
        .ok_or_else(|| {
            RetrievalError::MalformedResponse(format!("missing data.Get.Article in {}", body))
        })?;

    Ok(articles
        .iter()
        .filter_map(|article| article.get("content").and_then(Value::as_str))
        .map(str::to_string)
        .collect())
}

#[async_trait]
impl VectorIndex for WeaviateIndex {
    async fn near_text(&self, concepts: &[String]) -> Result<Vec<String>, RetrievalError> {
        let url = self.config.graphql_url();
        let query = build_near_text_query(concepts);
        debug!(url = %url, concepts = concepts.len(), "querying vector index");

        let response = self
            .http_client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("X-OpenAI-Api-Key", &self.config.openai_api_key)
            .json(&json!({ "query": query }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RetrievalError::HttpError {
                status: status.as_u16(),
                body,
            });
        }

        let body: Value = response.json().await?;
        article_contents(&body)
    }
}
