//! Per-request lifecycle.
//!
//! # States
//! ```text
//! Reading → Decoded → Dispatched → Streaming → Closed
//!    │          │          │            │
//!    └──────────┴──────────┴── error ───┴──▶ Closed (terminal frame)
//! ```
//!
//! Before `Streaming` nothing has been sent, so a failure becomes a complete
//! response: status, SSE headers and one terminal frame. Once streaming, the
//! status is committed and a failure can only append a terminal frame.

use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::http::request::RawBody;
use crate::http::response::{error_response, stream_response, terminal_frame};
use crate::observability::metrics;
use crate::relay::dispatcher::{FrameStream, UpstreamResponse};
use crate::relay::error::RelayError;
use crate::relay::observer::{RelayObserver, StreamSummary};
use crate::relay::pump::FrameRelay;
use crate::relay::RelayContext;

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Receiving the request body.
    Reading,
    /// Body decoded as JSON.
    Decoded,
    /// Upstream responded; body not read yet.
    Dispatched,
    /// Response committed, frames flowing.
    Streaming,
    /// Finished, successfully or not.
    Closed,
}

/// One relayed request, from body read to stream close.
pub struct RelaySession {
    request_id: String,
    state: SessionState,
    started: Instant,
    observer: Arc<dyn RelayObserver>,
}

impl RelaySession {
    pub fn new(request_id: impl Into<String>, observer: Arc<dyn RelayObserver>) -> Self {
        Self {
            request_id: request_id.into(),
            state: SessionState::Reading,
            started: Instant::now(),
            observer,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    fn advance(&mut self, next: SessionState) {
        tracing::trace!(
            request_id = %self.request_id,
            from = ?self.state,
            to = ?next,
            "Session state change"
        );
        self.state = next;
    }

    /// Serve `request` to completion. Never fails: every error is turned into
    /// a response here.
    pub async fn run(mut self, ctx: &RelayContext, request: Request<Body>) -> Response {
        match self.open_upstream(ctx, request).await {
            Ok(upstream) => self.stream(ctx, upstream),
            Err(err) => self.reject(err),
        }
    }

    async fn open_upstream(
        &mut self,
        ctx: &RelayContext,
        request: Request<Body>,
    ) -> Result<UpstreamResponse, RelayError> {
        let raw = RawBody::read(request, &ctx.config.limits).await?;
        tracing::info!(
            request_id = %self.request_id,
            bytes = raw.bytes.len(),
            body = %raw.preview(200),
            "Received request body"
        );

        let inbound = raw.decode()?;
        self.advance(SessionState::Decoded);

        let upstream = ctx.dispatcher.dispatch(&inbound.payload).await?;
        self.advance(SessionState::Dispatched);
        Ok(upstream)
    }

    /// Failure before anything was sent: full response with a terminal frame.
    fn reject(mut self, err: RelayError) -> Response {
        self.observer.on_error(&self.request_id, &err);
        let outcome = if err.status().is_client_error() {
            "rejected"
        } else {
            "failed"
        };
        metrics::record_request(outcome);
        self.advance(SessionState::Closed);
        error_response(err.status(), &err.client_message())
    }

    fn stream(mut self, ctx: &RelayContext, upstream: UpstreamResponse) -> Response {
        let status = upstream.status();
        if !status.is_success() {
            tracing::warn!(
                request_id = %self.request_id,
                upstream_status = %status,
                "Upstream answered with a non-success status; relaying its body anyway"
            );
        }

        self.advance(SessionState::Streaming);
        metrics::stream_opened();

        let (tx, rx) = mpsc::channel(1);
        let relay = FrameRelay::new(upstream.into_frames(ctx.config.limits.max_frame_size), tx)
            .idle_timeout(ctx.config.upstream.idle_timeout())
            .stop_on(ctx.drain.clone());
        tokio::spawn(self.pump(relay));

        stream_response(ReceiverStream::new(rx))
    }

    async fn pump(mut self, mut relay: FrameRelay<FrameStream>) {
        let observer = Arc::clone(&self.observer);
        let request_id = self.request_id.clone();
        let result = relay.run(|frame| observer.on_frame(&request_id, frame)).await;

        match result {
            Ok(()) => metrics::record_request("streamed"),
            Err(err) => {
                self.observer.on_error(&self.request_id, &err);
                let outcome = match err {
                    RelayError::ClientDisconnected => "disconnected",
                    _ => "failed",
                };
                metrics::record_request(outcome);
                if let RelayError::RelayInterrupted(_) = err {
                    // Status is already committed; only the body can carry the error.
                    relay.send_terminal(terminal_frame(&err.client_message())).await;
                }
            }
        }

        let summary = StreamSummary {
            frames: relay.frames_sent(),
            bytes: relay.bytes_sent(),
            elapsed: self.started.elapsed(),
        };
        // Dropping the relay releases the upstream body and ends the client body.
        drop(relay);
        self.observer.on_complete(&self.request_id, &summary);
        metrics::stream_closed();
        self.advance(SessionState::Closed);
    }
}
