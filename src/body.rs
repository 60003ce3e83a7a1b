// Streamed response bodies for relayed completions

use futures_util::stream::StreamExt;
use sync_wrapper::SyncStream;
use tracing::warn;
use warp::http::header::{HeaderValue, ACCESS_CONTROL_ALLOW_ORIGIN, CACHE_CONTROL, CONTENT_TYPE};
use warp::reply::Response;
use warp::Reply;

use crate::relay::RelayStream;

/// Reply with the relayed text exactly as it was forwarded
///
/// The body ends when the relay ends. A relay error is passed through to the
/// server as a body error, which aborts the connection instead of closing the
/// body cleanly, so a client can tell a failed answer from a finished one.
pub fn relay_reply(stream: RelayStream) -> Response {
    let body = stream.inspect(|item| {
        if let Err(e) = item {
            warn!(code = e.code(), error = %e, "aborting response body");
        }
    });

    let mut response = warp::reply::stream(SyncStream::new(body)).into_response();
    let headers = response.headers_mut();
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/event-stream;charset=utf-8"),
    );
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache, no-transform"));
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert("x-accel-buffering", HeaderValue::from_static("no"));
    response
}
