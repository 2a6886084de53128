//! Streaming relay subsystem.
//!
//! # Data Flow
//! ```text
//! POST body
//!     → http/request.rs (bounded read, JSON decode)
//!     → dispatcher.rs (one streaming POST to the upstream)
//!     → codec.rs (split upstream body into lines)
//!     → pump.rs (drop blank lines, forward the rest in order)
//!     → client response body
//!
//! session.rs owns the sequence and turns every failure into a terminal
//! event frame.
//! ```
//!
//! # Design Decisions
//! - Configuration is shared read-only; sessions share nothing mutable
//! - At most one upstream call per request, never retried
//! - At most one frame buffered between upstream and client

pub mod codec;
pub mod dispatcher;
pub mod error;
pub mod observer;
pub mod pump;
pub mod session;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::RelayConfig;

pub use dispatcher::{Dispatcher, Payload};
pub use error::RelayError;
pub use observer::{RelayObserver, StreamSummary, TelemetryObserver};
pub use session::{RelaySession, SessionState};

/// Everything a session needs, cloned into each request handler.
#[derive(Clone)]
pub struct RelayContext {
    pub config: Arc<RelayConfig>,
    pub dispatcher: Dispatcher,
    pub observer: Arc<dyn RelayObserver>,
    /// Cancelled when the server starts draining; live streams end on it.
    pub drain: CancellationToken,
}

impl RelayContext {
    /// Build the context with the default telemetry observer.
    pub fn new(config: Arc<RelayConfig>) -> Result<Self, reqwest::Error> {
        Self::with_observer(config, Arc::new(TelemetryObserver))
    }

    pub fn with_observer(
        config: Arc<RelayConfig>,
        observer: Arc<dyn RelayObserver>,
    ) -> Result<Self, reqwest::Error> {
        let dispatcher = Dispatcher::new(&config.upstream)?;
        Ok(Self {
            config,
            dispatcher,
            observer,
            drain: CancellationToken::new(),
        })
    }
}
