//! Inbound request adaptation.
//!
//! # Responsibilities
//! - Read the request body, bounded by the declared length and the size limit
//! - Detect bodies cut short by the peer
//! - Decode the body as JSON before any upstream call is made
//!
//! # Design Decisions
//! - The declared `Content-Length` is checked against the limit before reading
//! - The whole read runs under one deadline (`limits.body_read_timeout_secs`)
//! - The payload is validated, not rebuilt; its bytes are forwarded as received

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderMap, Request};
use bytes::BytesMut;
use futures_util::StreamExt;

use crate::config::LimitsConfig;
use crate::relay::dispatcher::Payload;
use crate::relay::error::RelayError;

/// Body bytes as received, before decoding.
#[derive(Debug)]
pub struct RawBody {
    pub declared_length: Option<u64>,
    pub bytes: Bytes,
}

/// A fully read and decoded inbound request.
#[derive(Debug)]
pub struct InboundRequest {
    pub declared_length: Option<u64>,
    pub body: Bytes,
    pub payload: Payload,
}

/// `Content-Length` as sent by the client, if it parses.
pub fn declared_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

impl RawBody {
    /// Read the body of `request` within the configured limits.
    pub async fn read(request: Request<Body>, limits: &LimitsConfig) -> Result<Self, RelayError> {
        let declared = declared_length(request.headers());
        let limit = limits.max_body_size;
        if declared.is_some_and(|len| len > limit as u64) {
            return Err(RelayError::PayloadTooLarge { limit });
        }

        let deadline = limits.body_read_timeout();
        let body = request.into_body();
        tokio::time::timeout(deadline, read_bounded(body, declared, limit))
            .await
            .map_err(|_| RelayError::BodyReadTimeout(deadline))?
    }

    /// Decode the body as a JSON payload.
    pub fn decode(self) -> Result<InboundRequest, RelayError> {
        let payload = Payload::from_slice(&self.bytes)?;
        Ok(InboundRequest {
            declared_length: self.declared_length,
            body: self.bytes,
            payload,
        })
    }

    /// The first `max_chars` characters of the body, for logs.
    pub fn preview(&self, max_chars: usize) -> String {
        String::from_utf8_lossy(&self.bytes).chars().take(max_chars).collect()
    }
}

async fn read_bounded(
    body: Body,
    declared: Option<u64>,
    limit: usize,
) -> Result<RawBody, RelayError> {
    let mut stream = body.into_data_stream();
    let mut buf = BytesMut::with_capacity(declared.unwrap_or(0) as usize);

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|_| RelayError::TruncatedBody {
            expected: declared,
            received: buf.len(),
        })?;
        if buf.len() + chunk.len() > limit {
            return Err(RelayError::PayloadTooLarge { limit });
        }
        buf.extend_from_slice(&chunk);
    }

    if let Some(expected) = declared {
        if (buf.len() as u64) < expected {
            return Err(RelayError::TruncatedBody {
                expected: declared,
                received: buf.len(),
            });
        }
    }

    Ok(RawBody {
        declared_length: declared,
        bytes: buf.freeze(),
    })
}
