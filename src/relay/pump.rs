//! The frame relay loop.
//!
//! Pulls line frames from the upstream body and pushes each non-empty one,
//! newline-terminated, into the channel that backs the client response.
//!
//! ```text
//! upstream body ─▶ FrameCodec ─▶ FrameRelay ─▶ mpsc(1) ─▶ client body
//! ```
//!
//! The channel holds at most one frame, so a slow client back-pressures the
//! upstream read instead of buffering. When the client body is dropped
//! (disconnect), the loop stops and the upstream response is released with it.

use std::time::Duration;

use bytes::{Bytes, BytesMut};
use futures_util::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::relay::codec::FrameError;
use crate::relay::error::RelayError;

/// Relays frames from `S` to a client sink, one at a time, in order.
pub struct FrameRelay<S> {
    frames: S,
    sink: mpsc::Sender<Bytes>,
    idle_timeout: Option<Duration>,
    stop: CancellationToken,
    frames_sent: u64,
    bytes_sent: u64,
}

impl<S> FrameRelay<S>
where
    S: Stream<Item = Result<Bytes, FrameError>> + Unpin,
{
    pub fn new(frames: S, sink: mpsc::Sender<Bytes>) -> Self {
        Self {
            frames,
            sink,
            idle_timeout: None,
            stop: CancellationToken::new(),
            frames_sent: 0,
            bytes_sent: 0,
        }
    }

    /// Fail the relay when upstream stays silent for longer than `timeout`.
    pub fn idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// End the relay with `RelayInterrupted` once `token` is cancelled.
    pub fn stop_on(mut self, token: CancellationToken) -> Self {
        self.stop = token;
        self
    }

    pub fn frames_sent(&self) -> u64 {
        self.frames_sent
    }

    /// Bytes written to the client, newlines included.
    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent
    }

    /// Run until upstream ends (`Ok`), upstream fails or the relay is stopped
    /// (`RelayInterrupted`), or the client goes away (`ClientDisconnected`). `on_frame` sees every
    /// forwarded frame before it is written.
    pub async fn run(&mut self, mut on_frame: impl FnMut(&[u8])) -> Result<(), RelayError> {
        loop {
            let frame = tokio::select! {
                biased;
                _ = self.sink.closed() => return Err(RelayError::ClientDisconnected),
                _ = self.stop.cancelled() => {
                    return Err(RelayError::RelayInterrupted("relay is shutting down".into()))
                }
                next = next_frame(&mut self.frames, self.idle_timeout) => next?,
            };
            let Some(frame) = frame else {
                return Ok(());
            };
            if frame.is_empty() {
                continue;
            }

            on_frame(&frame);

            let mut line = BytesMut::with_capacity(frame.len() + 1);
            line.extend_from_slice(&frame);
            line.extend_from_slice(b"\n");
            let len = line.len() as u64;

            self.sink
                .send(line.freeze())
                .await
                .map_err(|_| RelayError::ClientDisconnected)?;
            self.frames_sent += 1;
            self.bytes_sent += len;
        }
    }

    /// Write a final frame after a failure. The client may already be gone,
    /// in which case there is nobody to tell and the error is dropped.
    pub async fn send_terminal(&mut self, frame: Bytes) -> bool {
        let len = frame.len() as u64;
        if self.sink.send(frame).await.is_ok() {
            self.bytes_sent += len;
            true
        } else {
            false
        }
    }
}

async fn next_frame<S>(
    frames: &mut S,
    idle_timeout: Option<Duration>,
) -> Result<Option<Bytes>, RelayError>
where
    S: Stream<Item = Result<Bytes, FrameError>> + Unpin,
{
    let next = match idle_timeout {
        Some(limit) => match tokio::time::timeout(limit, frames.next()).await {
            Ok(next) => next,
            Err(_) => {
                return Err(RelayError::RelayInterrupted(format!(
                    "upstream idle for more than {}s",
                    limit.as_secs()
                )))
            }
        },
        None => frames.next().await,
    };
    next.transpose()
        .map_err(|e| RelayError::RelayInterrupted(e.to_string()))
}
