//! Metrics collection and exposition.
//!
//! # Metrics
//! - `relay_requests_total` (counter): requests by outcome
//! - `relay_frames_total` / `relay_frame_bytes_total` (counter): forwarded frames
//! - `relay_errors_total` (counter): failures by kind
//! - `relay_active_streams` (gauge): streams currently being relayed
//! - `relay_active_connections` (gauge): open client connections
//! - `relay_stream_duration_seconds` (histogram): stream lifetimes
//!
//! Recording goes through the `metrics` facade and is a no-op until a
//! recorder is installed, so tests never need one.

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Count a finished request by how it ended (`streamed`, `rejected`, `failed`, `preflight`).
pub fn record_request(outcome: &'static str) {
    counter!("relay_requests_total", "outcome" => outcome).increment(1);
}

pub fn record_frame(len: usize) {
    counter!("relay_frames_total").increment(1);
    counter!("relay_frame_bytes_total").increment(len as u64);
}

pub fn record_error(kind: &'static str) {
    counter!("relay_errors_total", "kind" => kind).increment(1);
}

pub fn stream_opened() {
    gauge!("relay_active_streams").increment(1.0);
}

pub fn stream_closed() {
    gauge!("relay_active_streams").decrement(1.0);
}

pub fn record_stream_duration(elapsed: Duration) {
    histogram!("relay_stream_duration_seconds").record(elapsed.as_secs_f64());
}

pub fn connection_opened() {
    gauge!("relay_active_connections").increment(1.0);
}

pub fn connection_closed() {
    gauge!("relay_active_connections").decrement(1.0);
}
