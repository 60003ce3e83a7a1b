//! Relay tests against a mock OpenAI endpoint

mod common;

use chat_relay::llm::{
    ChatCompletionRequest, ChatMessage, ChatProvider, LlmError, OpenAiClient, OpenAiConfig,
};
use chat_relay::relay::{RelayError, StreamRelay};
use chat_relay::store::{ConversationStore, InMemoryStore};
use futures::StreamExt;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const API_KEY: &str = "sk-test";

fn client(server: &MockServer) -> Arc<OpenAiClient> {
    let config = OpenAiConfig::new(API_KEY).with_base_url(server.uri());
    Arc::new(OpenAiClient::new(config).expect("Failed to create client"))
}

fn request() -> ChatCompletionRequest {
    ChatCompletionRequest::streaming(
        "gpt-3.5-turbo",
        vec![ChatMessage::user("What is 2+2? Answer with just the number.")],
    )
}

fn event_stream(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/event-stream")
        .set_body_string(body)
}

#[tokio::test]
async fn test_relay_streams_and_persists() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({"model": "gpt-3.5-turbo", "stream": true})))
        .respond_with(event_stream(common::sse_body(&["\n\n", "4"])))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(InMemoryStore::new());
    let relay = StreamRelay::new(client(&server), store.clone());

    let stream = relay.relay("conv-1", request()).await.expect("Failed to start stream");
    let chunks: Vec<_> = stream.collect().await;

    let text: String = chunks
        .into_iter()
        .map(|chunk| String::from_utf8(chunk.expect("Stream error").to_vec()).unwrap())
        .collect();
    assert_eq!(text, "4");
    assert_eq!(
        store.read_all("conv-1").await.unwrap(),
        vec![ChatMessage::system("4")]
    );
}

#[tokio::test]
async fn test_server_error_performs_no_appends() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
        .mount(&server)
        .await;

    let store = Arc::new(InMemoryStore::new());
    let relay = StreamRelay::new(client(&server), store.clone());

    match relay.relay("conv-1", request()).await {
        Err(err @ RelayError::Upstream(LlmError::HttpError { status: 500, .. })) => {
            assert_eq!(err.code(), "upstream_status");
            assert!(err.to_string().contains("internal error"));
        }
        Err(other) => panic!("unexpected error: {}", other),
        Ok(_) => panic!("expected an upstream error"),
    }

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(store.conversation_count().await, 0);
}

#[tokio::test]
async fn test_rate_limit_carries_retry_after() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "7"))
        .mount(&server)
        .await;

    let relay = StreamRelay::new(client(&server), Arc::new(InMemoryStore::new()));

    match relay.relay("conv-1", request()).await {
        Err(err @ RelayError::Upstream(LlmError::RateLimitExceeded { .. })) => {
            assert_eq!(err.code(), "rate_limited");
            if let RelayError::Upstream(LlmError::RateLimitExceeded { retry_after }) = err {
                assert_eq!(retry_after, Some(Duration::from_secs(7)));
            }
        }
        Err(other) => panic!("unexpected error: {}", other),
        Ok(_) => panic!("expected a rate limit error"),
    }
}

#[tokio::test]
async fn test_unreachable_provider() {
    let config = OpenAiConfig::new(API_KEY)
        .with_base_url("http://127.0.0.1:1")
        .with_connect_timeout(Duration::from_secs(1));
    let client = Arc::new(OpenAiClient::new(config).unwrap());
    let relay = StreamRelay::new(client, Arc::new(InMemoryStore::new()));

    match relay.relay("conv-1", request()).await {
        Err(err) => assert_eq!(err.code(), "upstream_unavailable"),
        Ok(_) => panic!("expected a connection error"),
    }
}

#[tokio::test]
async fn test_truncated_stream_is_framing_error() {
    let server = MockServer::start().await;
    let body = common::sse_body(&["Hello"]).replace("data: [DONE]\n\n", "");
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(event_stream(body))
        .mount(&server)
        .await;

    let store = Arc::new(InMemoryStore::new());
    let relay = StreamRelay::new(client(&server), store.clone());

    let chunks: Vec<_> = relay.relay("conv-1", request()).await.unwrap().collect().await;

    assert_eq!(chunks.len(), 2);
    assert!(matches!(chunks[1], Err(RelayError::Framing(_))));
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(store.read_all("conv-1").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_non_streaming_completion() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(json!({"stream": false})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "chatcmpl-test",
            "object": "chat.completion",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "[\"SfButton\"]"},
                "finish_reason": "stop"
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let answer = client(&server)
        .complete(ChatCompletionRequest::blocking(
            "gpt-3.5-turbo",
            vec![ChatMessage::user("Which components?")],
        ))
        .await
        .expect("completion failed");

    assert_eq!(answer, "[\"SfButton\"]");
}
