//! Failure taxonomy for a single relayed request.

use std::time::Duration;

use axum::http::StatusCode;

/// Errors raised while serving one relayed request.
///
/// None of these ever escape the connection that produced them; the session
/// converts each one into a terminal event frame (or silence, when the client
/// is gone).
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// The peer closed before sending the declared number of body bytes.
    #[error("request body truncated: expected {expected:?} bytes, received {received}")]
    TruncatedBody { expected: Option<u64>, received: usize },

    /// The body exceeds the configured limit.
    #[error("request body exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },

    /// The body did not arrive in time.
    #[error("request body not received within {0:?}")]
    BodyReadTimeout(Duration),

    /// The body is not valid JSON.
    #[error("invalid JSON payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),

    /// The upstream call could not be issued or no response arrived in time.
    #[error("{0}")]
    UpstreamUnreachable(String),

    /// The upstream stream failed after the response was committed.
    #[error("{0}")]
    RelayInterrupted(String),

    /// A write to the client failed; the client went away.
    #[error("client disconnected")]
    ClientDisconnected,
}

impl RelayError {
    /// Status code for failures raised before the response is committed.
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::TruncatedBody { .. } | RelayError::MalformedPayload(_) => {
                StatusCode::BAD_REQUEST
            }
            RelayError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            RelayError::BodyReadTimeout(_) => StatusCode::REQUEST_TIMEOUT,
            RelayError::UpstreamUnreachable(_)
            | RelayError::RelayInterrupted(_)
            | RelayError::ClientDisconnected => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The text carried in the `data:` line of the terminal frame.
    pub fn client_message(&self) -> String {
        match self {
            RelayError::TruncatedBody { .. } => "Incomplete request body".to_string(),
            RelayError::PayloadTooLarge { .. } => "Request body too large".to_string(),
            RelayError::BodyReadTimeout(_) => "Request body read timed out".to_string(),
            RelayError::MalformedPayload(_) => "Invalid JSON format".to_string(),
            RelayError::UpstreamUnreachable(message)
            | RelayError::RelayInterrupted(message) => format!("Server error - {}", message),
            RelayError::ClientDisconnected => "Server error - client disconnected".to_string(),
        }
    }

    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            RelayError::TruncatedBody { .. } => "truncated_body",
            RelayError::PayloadTooLarge { .. } => "payload_too_large",
            RelayError::BodyReadTimeout(_) => "body_read_timeout",
            RelayError::MalformedPayload(_) => "malformed_payload",
            RelayError::UpstreamUnreachable(_) => "upstream_unreachable",
            RelayError::RelayInterrupted(_) => "relay_interrupted",
            RelayError::ClientDisconnected => "client_disconnected",
        }
    }
}

/// Flatten an error and its sources into one line, e.g.
/// `error sending request for url (...): connection refused`.
pub fn describe(error: &(dyn std::error::Error + 'static)) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_maps_to_400_invalid_json() {
        let err = RelayError::from(serde_json::from_slice::<serde_json::Value>(b"{").unwrap_err());
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.client_message(), "Invalid JSON format");
    }

    #[test]
    fn upstream_failure_prefixes_server_error() {
        let err = RelayError::UpstreamUnreachable("connection refused".into());
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.client_message(), "Server error - connection refused");
    }

    #[test]
    fn describe_walks_sources() {
        let inner = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let outer = std::io::Error::new(std::io::ErrorKind::Other, Wrapped(inner));
        assert_eq!(describe(&outer), "wrapped: refused");
    }

    #[derive(Debug, thiserror::Error)]
    #[error("wrapped")]
    struct Wrapped(#[source] std::io::Error);
}
