//! Client-facing responses.
//!
//! Every response the relay produces for a POST is an event stream, failures
//! included, so clients parse errors with the same reader they use for data.

use std::convert::Infallible;

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderName, StatusCode};
use axum::response::{IntoResponse, Response};
use futures_util::{Stream, StreamExt};

pub const TEXT_EVENT_STREAM: &str = "text/event-stream";

fn sse_headers() -> [(HeaderName, &'static str); 4] {
    [
        (header::CONTENT_TYPE, TEXT_EVENT_STREAM),
        (header::CACHE_CONTROL, "no-cache"),
        (header::CONNECTION, "keep-alive"),
        (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
    ]
}

/// `event: error` frame carrying `message`. Line breaks in the message are
/// flattened so the frame stays a single event.
pub fn terminal_frame(message: &str) -> Bytes {
    let message = message.replace(['\r', '\n'], " ");
    Bytes::from(format!("event: error\ndata: {}\n\n", message))
}

/// Status, SSE headers and a single terminal frame.
pub fn error_response(status: StatusCode, message: &str) -> Response {
    (status, sse_headers(), terminal_frame(message)).into_response()
}

/// 200 with SSE headers and a body fed by `frames`.
pub fn stream_response<S>(frames: S) -> Response
where
    S: Stream<Item = Bytes> + Send + 'static,
{
    let body = Body::from_stream(frames.map(Ok::<_, Infallible>));
    (StatusCode::OK, sse_headers(), body).into_response()
}

/// Answer to a CORS preflight: permissive headers, empty body.
pub fn preflight_response() -> Response {
    (
        StatusCode::OK,
        [
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
            (header::ACCESS_CONTROL_ALLOW_METHODS, "POST, OPTIONS"),
            (header::ACCESS_CONTROL_ALLOW_HEADERS, "Content-Type, Authorization"),
            (header::ACCESS_CONTROL_MAX_AGE, "86400"),
        ],
    )
        .into_response()
}
