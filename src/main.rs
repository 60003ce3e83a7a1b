use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use chat_relay::config::AppConfig;
use chat_relay::conversation::ChatService;
use chat_relay::handlers::AppState;
use chat_relay::llm::OpenAiClient;
use chat_relay::relay::StreamRelay;
use chat_relay::retrieval::{RetrievalPipeline, WeaviateConfig, WeaviateIndex};
use chat_relay::routes::configure_routes;
use chat_relay::store::{ConversationStore, InMemoryStore, MessageDbConfig, MessageDbStore};

#[tokio::main]
async fn main() {
    // A missing .env file is fine
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,chat_relay=debug".into()),
        )
        .with_target(false)
        .init();

    let config = AppConfig::from_env().expect("Invalid configuration");

    let provider = Arc::new(OpenAiClient::new(config.openai.clone()).expect("Failed to create OpenAI client"));

    let store: Arc<dyn ConversationStore> = match &config.message_db {
        Some(db) => {
            let db_config = MessageDbConfig::from_connection_string(&db.url)
                .expect("Invalid MESSAGE_DB_URL")
                .with_schema_name(db.schema.clone())
                .with_max_pool_size(db.pool_size);
            info!(schema = %db.schema, "using Message DB conversation store");
            Arc::new(
                MessageDbStore::new(db_config)
                    .await
                    .expect("Failed to connect to Message DB"),
            )
        }
        None => {
            warn!("MESSAGE_DB_URL not set, conversations are kept in memory");
            Arc::new(InMemoryStore::new())
        }
    };

    let shutdown = CancellationToken::new();
    let relay = StreamRelay::new(provider.clone(), store.clone()).with_timeouts(config.timeouts);
    let mut chat = ChatService::new(relay, store, config.openai.model.clone()).with_shutdown(shutdown.clone());

    match &config.weaviate {
        Some(weaviate) => {
            let index = WeaviateIndex::new(WeaviateConfig::for_cluster(
                &weaviate.cluster,
                weaviate.api_key.clone(),
                config.openai.api_key.clone(),
            ));
            let pipeline = RetrievalPipeline::new(provider, Arc::new(index), config.openai.model.clone());
            chat = chat.with_retriever(Arc::new(pipeline));
            info!(cluster = %weaviate.cluster, "retrieval enabled");
        }
        None => warn!("WEAVIATE_CLUSTER not set, questions are answered without retrieved context"),
    }

    let routes = configure_routes(Arc::new(AppState { chat }));

    info!("Starting server on http://{}", config.bind_addr);
    tokio::select! {
        _ = warp::serve(routes).run(config.bind_addr) => {}
        _ = tokio::signal::ctrl_c() => {
            info!("shutting down, cancelling open streams");
            shutdown.cancel();
        }
    }
}
