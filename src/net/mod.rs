//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept loop, connection ceiling)
//!     → connection.rs (id, open-connection count)
//!     → Hand off to HTTP layer (axum::serve)
//! ```
//!
//! # Design Decisions
//! - Bounded accept: a slot is taken before `accept`, so excess clients
//!   wait in the kernel backlog instead of consuming a task
//! - The slot travels with the socket and is released when it closes

pub mod connection;
pub mod listener;

pub use listener::{Listener, ListenerError};
