//! Hook points for watching relayed streams.

use std::time::Duration;

use crate::observability::metrics;
use crate::relay::error::RelayError;

/// Totals for one finished stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamSummary {
    pub frames: u64,
    pub bytes: u64,
    pub elapsed: Duration,
}

/// Subscriber for relay events. Every method has a no-op default so an
/// implementation only overrides what it cares about.
///
/// Callbacks run inline on the relay task; keep them cheap.
pub trait RelayObserver: Send + Sync + 'static {
    /// A non-empty frame was received from upstream and is about to be sent.
    fn on_frame(&self, _request_id: &str, _frame: &[u8]) {}

    /// The request failed at any stage.
    fn on_error(&self, _request_id: &str, _error: &RelayError) {}

    /// The upstream stream ended (normally or not) and the session closed.
    fn on_complete(&self, _request_id: &str, _summary: &StreamSummary) {}
}

/// Default observer: structured logs plus metrics.
#[derive(Debug, Clone, Copy, Default)]
pub struct TelemetryObserver;

impl RelayObserver for TelemetryObserver {
    fn on_frame(&self, request_id: &str, frame: &[u8]) {
        let preview = &frame[..frame.len().min(100)];
        tracing::debug!(
            request_id = %request_id,
            len = frame.len(),
            frame = %String::from_utf8_lossy(preview),
            "Forwarded frame"
        );
        metrics::record_frame(frame.len());
    }

    fn on_error(&self, request_id: &str, error: &RelayError) {
        match error {
            RelayError::ClientDisconnected => {
                tracing::info!(request_id = %request_id, "Client went away mid-stream");
            }
            _ => {
                tracing::error!(
                    request_id = %request_id,
                    kind = error.kind(),
                    error = %error,
                    "Relay failed"
                );
            }
        }
        metrics::record_error(error.kind());
    }

    fn on_complete(&self, request_id: &str, summary: &StreamSummary) {
        tracing::info!(
            request_id = %request_id,
            frames = summary.frames,
            bytes = summary.bytes,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "Stream closed"
        );
        metrics::record_stream_duration(summary.elapsed);
    }
}
