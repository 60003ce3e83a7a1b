// POST /api/chat handler

use std::convert::Infallible;
use std::sync::Arc;
use tracing::info;
use warp::reply::Response;

use super::{error_reply, AppState};
use crate::models::ChatRequest;
use crate::body::relay_reply;

pub async fn chat_handler(
    state: Arc<AppState>,
    request: ChatRequest,
) -> Result<Response, Infallible> {
    info!(conversation_id = %request.conversation_id, "POST /api/chat");

    match state
        .chat
        .continue_chat(&request.query, &request.conversation_id)
        .await
    {
        Ok(stream) => Ok(relay_reply(stream)),
        Err(e) => Ok(error_reply(&e)),
    }
}
