//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection (net::Listener)
//!     → server.rs (Axum setup, request ID, tracing)
//!     → OPTIONS: response.rs preflight, done
//!     → POST: relay::RelaySession
//!         → request.rs (bounded body read, JSON decode)
//!         → response.rs (SSE headers, terminal frames, streamed body)
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use server::{HttpServer, X_REQUEST_ID};
