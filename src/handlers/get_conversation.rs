// GET /api/conversations/{id} handler

use std::convert::Infallible;
use std::sync::Arc;
use tracing::info;
use warp::http::StatusCode;
use warp::reply::Response;
use warp::Reply;

use super::{error_reply, AppState};
use crate::models::ConversationResponse;

pub async fn get_conversation_handler(
    conversation_id: String,
    state: Arc<AppState>,
) -> Result<Response, Infallible> {
    info!(conversation_id = %conversation_id, "GET /api/conversations");

    match state.chat.history(&conversation_id).await {
        Ok(messages) => {
            let response = ConversationResponse {
                conversation_id,
                messages,
            };
            Ok(warp::reply::with_status(warp::reply::json(&response), StatusCode::OK).into_response())
        }
        Err(e) => Ok(error_reply(&e)),
    }
}
