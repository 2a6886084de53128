//! Upstream dispatch.
//!
//! # Responsibilities
//! - Hold the one shared HTTP client for the configured upstream
//! - Issue exactly one streaming POST per relayed request
//! - Bound the wait for response headers (first byte)
//! - Hand back the live body as a stream of line frames
//!
//! # Design Decisions
//! - Any HTTP status counts as a started stream; frames are relayed whatever
//!   the upstream status is
//! - No retries: a failed call surfaces immediately

use std::pin::Pin;
use std::time::Duration;

use bytes::Bytes;
use futures_util::{Stream, TryStreamExt};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Response, StatusCode};
use serde_json::value::RawValue;
use tokio_util::codec::FramedRead;
use tokio_util::io::StreamReader;

use crate::config::UpstreamConfig;
use crate::relay::codec::{FrameCodec, FrameError};
use crate::relay::error::{describe, RelayError};

/// Line frames read from an upstream body.
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<Bytes, FrameError>> + Send>>;

/// A JSON document that has been validated but is kept byte-for-byte as the
/// client sent it.
#[derive(Debug)]
pub struct Payload(Box<RawValue>);

impl Payload {
    /// Validate `bytes` as a single JSON value.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice::<Box<RawValue>>(bytes).map(Payload)
    }

    pub fn as_str(&self) -> &str {
        self.0.get()
    }

    pub fn len(&self) -> usize {
        self.0.get().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.get().is_empty()
    }
}

/// Issues outbound streaming calls to the configured upstream.
#[derive(Clone)]
pub struct Dispatcher {
    client: Client,
    endpoint: String,
    api_key: String,
    first_byte_timeout: Duration,
}

impl Dispatcher {
    /// Build the dispatcher and its HTTP client.
    pub fn new(config: &UpstreamConfig) -> Result<Self, reqwest::Error> {
        let mut builder = Client::builder().connect_timeout(config.first_byte_timeout());
        if !config.use_system_proxy {
            builder = builder.no_proxy();
        }

        Ok(Self {
            client: builder.build()?,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            first_byte_timeout: config.first_byte_timeout(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Forward `payload` and wait for the upstream response headers.
    pub async fn dispatch(&self, payload: &Payload) -> Result<UpstreamResponse, RelayError> {
        tracing::info!(endpoint = %self.endpoint, bytes = payload.len(), "Forwarding request");

        let request = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "text/event-stream")
            .body(payload.as_str().to_owned());

        match tokio::time::timeout(self.first_byte_timeout, request.send()).await {
            Ok(Ok(response)) => Ok(UpstreamResponse { response }),
            Ok(Err(e)) => Err(RelayError::UpstreamUnreachable(describe(&e))),
            Err(_) => Err(RelayError::UpstreamUnreachable(format!(
                "upstream did not respond within {}s",
                self.first_byte_timeout.as_secs()
            ))),
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("endpoint", &self.endpoint)
            .field("first_byte_timeout", &self.first_byte_timeout)
            .finish_non_exhaustive()
    }
}

/// A started upstream response whose body has not been read yet.
#[derive(Debug)]
pub struct UpstreamResponse {
    response: Response,
}

impl UpstreamResponse {
    pub fn status(&self) -> StatusCode {
        self.response.status()
    }

    /// Turn the body into line frames no longer than `max_frame_size`.
    pub fn into_frames(self, max_frame_size: usize) -> FrameStream {
        let body = self
            .response
            .bytes_stream()
            .map_err(|e| std::io::Error::other(describe(&e)));
        Box::pin(FramedRead::new(
            StreamReader::new(body),
            FrameCodec::new(max_frame_size),
        ))
    }
}
