//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Relay sessions and the listener produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout (text or JSON lines)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - Request ID (x-request-id) labels every session log line
//! - Metrics are cheap (atomic increments) and recorded through the
//!   `RelayObserver` hooks

pub mod logging;
pub mod metrics;
