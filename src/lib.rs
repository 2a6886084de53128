//! Streaming SSE relay.
//!
//! Accepts a JSON POST, forwards it to one configured event-stream upstream
//! with a bearer credential, and streams the upstream's lines back to the
//! caller as they arrive.
//!
//! ```text
//!   client ──POST json──▶ ┌──────────────────────────────────────┐
//!                         │ net::Listener (connection ceiling)   │
//!                         │   → http::server (axum, request id)  │
//!                         │   → relay::RelaySession              │
//!                         │       request → dispatcher → pump    │
//!                         └──────────────────┬───────────────────┘
//!                                            │ POST + Bearer
//!   client ◀──text/event-stream── frames ◀── upstream
//! ```

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod relay;

pub use config::RelayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use net::Listener;
