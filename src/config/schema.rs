//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the relay.
//! All types derive Serde traits for deserialization from config files.

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the relay.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RelayConfig {
    /// Listener configuration (bind address, connection ceiling).
    pub listener: ListenerConfig,

    /// The single upstream event-stream endpoint and its credential.
    pub upstream: UpstreamConfig,

    /// Inbound body and frame limits.
    pub limits: LimitsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8000").
    pub bind_address: String,

    /// Maximum concurrent connections (backpressure).
    pub max_connections: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8000".to_string(),
            max_connections: 1024,
        }
    }
}

impl ListenerConfig {
    /// Replace the port of `bind_address`, keeping the host part. The address
    /// may be a full socket address, a bare IP, or `host[:port]`.
    pub fn set_port(&mut self, port: u16) {
        if let Ok(mut addr) = self.bind_address.parse::<SocketAddr>() {
            addr.set_port(port);
            self.bind_address = addr.to_string();
            return;
        }
        let host = match self.bind_address.parse::<IpAddr>() {
            Ok(IpAddr::V6(ip)) => format!("[{}]", ip),
            Ok(IpAddr::V4(ip)) => ip.to_string(),
            // Bracketed IPv6 without a port.
            Err(_) if self.bind_address.ends_with(']') => self.bind_address.clone(),
            Err(_) => match self.bind_address.rsplit_once(':') {
                Some((host, _)) => host.to_string(),
                None => self.bind_address.clone(),
            },
        };
        self.bind_address = format!("{}:{}", host, port);
    }
}

/// Upstream endpoint configuration.
#[derive(Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Event-stream endpoint every request is forwarded to.
    pub endpoint: String,

    /// Credential sent as `Authorization: Bearer <api_key>`.
    pub api_key: String,

    /// Time allowed to connect and receive response headers.
    pub first_byte_timeout_secs: u64,

    /// Maximum silence between two upstream frames. `None` waits forever.
    pub idle_timeout_secs: Option<u64>,

    /// Honor `HTTP_PROXY`/`HTTPS_PROXY` for the upstream call.
    pub use_system_proxy: bool,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_key: String::new(),
            first_byte_timeout_secs: 60,
            idle_timeout_secs: None,
            use_system_proxy: true,
        }
    }
}

impl UpstreamConfig {
    pub fn first_byte_timeout(&self) -> Duration {
        Duration::from_secs(self.first_byte_timeout_secs)
    }

    pub fn idle_timeout(&self) -> Option<Duration> {
        self.idle_timeout_secs.map(Duration::from_secs)
    }
}

impl std::fmt::Debug for UpstreamConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let api_key = if self.api_key.is_empty() { "<unset>" } else { "<redacted>" };
        f.debug_struct("UpstreamConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &api_key)
            .field("first_byte_timeout_secs", &self.first_byte_timeout_secs)
            .field("idle_timeout_secs", &self.idle_timeout_secs)
            .field("use_system_proxy", &self.use_system_proxy)
            .finish()
    }
}

/// Request and frame limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum inbound body size in bytes.
    pub max_body_size: usize,

    /// Maximum length of a single upstream line in bytes.
    pub max_frame_size: usize,

    /// Time allowed to receive the full inbound body.
    pub body_read_timeout_secs: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_size: 2 * 1024 * 1024, // 2MB
            max_frame_size: 1024 * 1024,
            body_read_timeout_secs: 30,
        }
    }
}

impl LimitsConfig {
    pub fn body_read_timeout(&self) -> Duration {
        Duration::from_secs(self.body_read_timeout_secs)
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error) or a full filter directive.
    pub log_level: String,

    /// Emit logs as JSON lines instead of human-readable text.
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
