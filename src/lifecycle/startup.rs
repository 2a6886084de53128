//! Startup orchestration.
//!
//! # Responsibilities
//! - Report configuration warnings
//! - Start optional background services (metrics exporter)
//! - Bind the listener and serve until shutdown
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Listener binds last (traffic only when ready)

use std::net::SocketAddr;

use crate::config::LoadedConfig;
use crate::http::HttpServer;
use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::signals::spawn_signal_handler;
use crate::net::{Listener, ListenerError};
use crate::observability::metrics;

/// Fatal errors while bringing the relay up.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("failed to build upstream client: {0}")]
    Client(#[from] reqwest::Error),
    #[error("failed to start metrics exporter: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),
    #[error(transparent)]
    Listener(#[from] ListenerError),
    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),
}

/// Run the relay with a validated configuration until a shutdown signal.
pub async fn run(loaded: LoadedConfig) -> Result<(), StartupError> {
    let LoadedConfig { config, warnings } = loaded;
    for warning in &warnings {
        tracing::warn!("{}", warning);
    }

    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_connections = config.listener.max_connections,
        upstream = %config.upstream.endpoint,
        first_byte_timeout_secs = config.upstream.first_byte_timeout_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        // Validation already checked the address.
        if let Ok(addr) = config.observability.metrics_address.parse::<SocketAddr>() {
            metrics::init_metrics(addr)?;
        }
    }

    let server = HttpServer::new(config.clone())?;
    let listener = Listener::bind(&config.listener).await?;

    let shutdown = Shutdown::new();
    let signals = spawn_signal_handler(shutdown.clone());

    server.run(listener, shutdown.subscribe()).await?;
    signals.abort();

    tracing::info!("Shutdown complete");
    Ok(())
}
