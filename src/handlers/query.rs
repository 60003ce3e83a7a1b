// POST /api/query handler

use std::convert::Infallible;
use std::sync::Arc;
use tracing::info;
use warp::reply::Response;
use warp::Reply;

use super::{error_reply, AppState, CONVERSATION_ID_HEADER};
use crate::body::relay_reply;
use crate::conversation::QueryReply;
use crate::models::QueryRequest;

pub async fn query_handler(
    state: Arc<AppState>,
    request: QueryRequest,
) -> Result<Response, Infallible> {
    info!(conversation_id = ?request.conversation_id, "POST /api/query");

    let outcome = match state
        .chat
        .begin_query(&request.query, request.conversation_id)
        .await
    {
        Ok(outcome) => outcome,
        Err(e) => return Ok(error_reply(&e)),
    };

    let reply = match outcome.reply {
        QueryReply::Stream(stream) => relay_reply(stream),
        QueryReply::NoContext(text) => text.into_response(),
    };

    Ok(warp::reply::with_header(reply, CONVERSATION_ID_HEADER, outcome.conversation_id).into_response())
}
