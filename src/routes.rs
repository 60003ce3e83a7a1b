// Route definitions and handlers

use std::convert::Infallible;
use std::sync::Arc;
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

use crate::handlers::{self, AppState};
use crate::models::ErrorBody;

/// Largest accepted JSON request body
const MAX_BODY_BYTES: u64 = 64 * 1024;

pub fn configure_routes(
    state: Arc<AppState>,
) -> impl Filter<Extract = impl warp::Reply, Error = Infallible> + Clone {
    let api = warp::path("api");

    // POST /api/query
    let query = api
        .and(warp::path("query"))
        .and(warp::path::end())
        .and(warp::post())
        .and(with_state(state.clone()))
        .and(json_body())
        .and_then(handlers::query_handler);

    // POST /api/chat
    let chat = api
        .and(warp::path("chat"))
        .and(warp::path::end())
        .and(warp::post())
        .and(with_state(state.clone()))
        .and(json_body())
        .and_then(handlers::chat_handler);

    // GET /api/conversations/{conversationId}
    let get_conversation = api
        .and(warp::path("conversations"))
        .and(warp::path::param::<String>())
        .and(warp::path::end())
        .and(warp::get())
        .and(with_state(state))
        .and_then(handlers::get_conversation_handler);

    // Combine routes
    query.or(chat).or(get_conversation).recover(handle_rejection)
}

fn with_state(
    state: Arc<AppState>,
) -> impl Filter<Extract = (Arc<AppState>,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

fn json_body<T>() -> impl Filter<Extract = (T,), Error = Rejection> + Clone
where
    T: serde::de::DeserializeOwned + Send + 'static,
{
    warp::body::content_length_limit(MAX_BODY_BYTES).and(warp::body::json())
}

/// Render rejections with the same JSON error shape as handler failures
async fn handle_rejection(rejection: Rejection) -> Result<impl Reply, Infallible> {
    let (status, code, message) = if rejection.is_not_found() {
        (StatusCode::NOT_FOUND, "not_found", "no such route".to_string())
    } else if let Some(e) = rejection.find::<warp::filters::body::BodyDeserializeError>() {
        (StatusCode::BAD_REQUEST, "invalid_request", e.to_string())
    } else if rejection.find::<warp::reject::PayloadTooLarge>().is_some() {
        (
            StatusCode::PAYLOAD_TOO_LARGE,
            "invalid_request",
            "request body too large".to_string(),
        )
    } else if rejection.find::<warp::reject::MethodNotAllowed>().is_some() {
        (
            StatusCode::METHOD_NOT_ALLOWED,
            "method_not_allowed",
            "method not allowed".to_string(),
        )
    } else {
        (
            StatusCode::BAD_REQUEST,
            "invalid_request",
            format!("{:?}", rejection),
        )
    };

    Ok(warp::reply::with_status(
        warp::reply::json(&ErrorBody::new(code, message)),
        status,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::ChatService;
    use crate::llm::mock::{completion_chunk, done_chunk};
    use crate::llm::{ChatMessage, MockProvider};
    use crate::relay::StreamRelay;
    use crate::retrieval::prompt::HISTORY_SYSTEM_PROMPT;
    use crate::llm::LlmError;
    use crate::store::{ConversationStore, InMemoryStore};
    use serde_json::Value;

    fn state(provider: MockProvider) -> (Arc<AppState>, Arc<InMemoryStore>) {
        let provider = Arc::new(provider);
        let store = Arc::new(InMemoryStore::new());
        let relay = StreamRelay::new(provider, store.clone());
        let chat = ChatService::new(relay, store.clone(), "gpt-3.5-turbo");
        (Arc::new(AppState { chat }), store)
    }

    #[tokio::test]
    async fn test_chat_body_is_the_stored_answer() {
        let provider = MockProvider::new().with_stream(vec![
            completion_chunk("Hello"),
            completion_chunk(" wor\r\nld"),
            done_chunk(),
        ]);
        let (state, store) = state(provider);
        let routes = configure_routes(state);

        let response = warp::test::request()
            .method("POST")
            .path("/api/chat")
            .json(&serde_json::json!({"query": "hi", "conversationId": "c1"}))
            .reply(&routes)
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()["content-type"],
            "text/event-stream;charset=utf-8"
        );
        assert_eq!(response.body().as_ref(), b"Hello wor\r\nld");

        let history = store.read_all("c1").await.unwrap();
        assert_eq!(
            history,
            vec![ChatMessage::user("hi"), ChatMessage::system("Hello wor\r\nld")]
        );
        assert_eq!(response.body().as_ref(), history[1].content.as_bytes());
    }

    #[tokio::test]
    async fn test_query_returns_conversation_id_header() {
        let provider = MockProvider::new().with_stream(vec![completion_chunk("ok"), done_chunk()]);
        let (state, store) = state(provider);
        let routes = configure_routes(state);

        let response = warp::test::request()
            .method("POST")
            .path("/api/query")
            .json(&serde_json::json!({"query": "What is SfButton?"}))
            .reply(&routes)
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        let conversation_id = response.headers()[handlers::CONVERSATION_ID_HEADER]
            .to_str()
            .unwrap()
            .to_string();
        let history = store.read_all(&conversation_id).await.unwrap();
        assert_eq!(history[0], ChatMessage::system(HISTORY_SYSTEM_PROMPT));
        assert_eq!(history.len(), 3);
        assert_eq!(response.body().as_ref(), b"ok");
    }

    #[tokio::test]
    async fn test_upstream_failure_is_json_error() {
        let provider = MockProvider::new().with_stream_error(LlmError::HttpError {
            status: 500,
            body: "internal".to_string(),
        });
        let (state, _) = state(provider);
        let routes = configure_routes(state);

        let response = warp::test::request()
            .method("POST")
            .path("/api/chat")
            .json(&serde_json::json!({"query": "hi", "conversationId": "c1"}))
            .reply(&routes)
            .await;

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body: Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body["error"]["code"], "upstream_status");
    }

    #[tokio::test]
    async fn test_get_conversation() {
        let (state, store) = state(MockProvider::new());
        store.append("c1", ChatMessage::user("hi")).await.unwrap();
        store.append("c1", ChatMessage::system("hello")).await.unwrap();
        let routes = configure_routes(state);

        let response = warp::test::request()
            .method("GET")
            .path("/api/conversations/c1")
            .reply(&routes)
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body["conversationId"], "c1");
        assert_eq!(body["messages"][1]["content"], "hello");
    }

    #[tokio::test]
    async fn test_invalid_bodies_are_rejected_as_json() {
        let (state, _) = state(MockProvider::new());
        let routes = configure_routes(state);

        let missing_id = warp::test::request()
            .method("POST")
            .path("/api/chat")
            .json(&serde_json::json!({"query": "hi"}))
            .reply(&routes)
            .await;
        assert_eq!(missing_id.status(), StatusCode::BAD_REQUEST);
        let body: Value = serde_json::from_slice(missing_id.body()).unwrap();
        assert_eq!(body["error"]["code"], "invalid_request");

        let empty_query = warp::test::request()
            .method("POST")
            .path("/api/chat")
            .json(&serde_json::json!({"query": " ", "conversationId": "c1"}))
            .reply(&routes)
            .await;
        assert_eq!(empty_query.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let (state, _) = state(MockProvider::new());
        let routes = configure_routes(state);

        let response = warp::test::request().path("/api/nope").reply(&routes).await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
