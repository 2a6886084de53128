//! SSE relay server binary.

use std::path::PathBuf;

use clap::Parser;

use sse_relay::config::{load_with_overrides, ConfigOverrides};
use sse_relay::lifecycle::startup;
use sse_relay::observability::logging;

#[derive(Parser)]
#[command(name = "sse-relay")]
#[command(about = "Relay JSON POSTs to an event-stream upstream and stream the response back", long_about = None)]
struct Cli {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(short, long, env = "PROXY_CONFIG")]
    config: Option<PathBuf>,

    /// Upstream event-stream endpoint.
    #[arg(long, env = "PROXY_TARGET_ENDPOINT")]
    endpoint: Option<String>,

    /// Bearer credential for the upstream.
    #[arg(long, env = "PROXY_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Listen address, e.g. 0.0.0.0:8000.
    #[arg(long, env = "PROXY_BIND_ADDRESS")]
    bind: Option<String>,

    /// Listen port (keeps the host of the bind address).
    #[arg(short, long, env = "PROXY_PORT")]
    port: Option<u16>,

    /// Log level or filter directive.
    #[arg(long, env = "PROXY_LOG_LEVEL")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let overrides = ConfigOverrides {
        endpoint: cli.endpoint,
        api_key: cli.api_key,
        bind_address: cli.bind,
        port: cli.port,
        log_level: cli.log_level,
    };
    let loaded = load_with_overrides(cli.config.as_deref(), overrides)?;

    logging::init_logging(&loaded.config.observability)?;
    tracing::info!("sse-relay v{} starting", env!("CARGO_PKG_VERSION"));

    startup::run(loaded).await?;
    Ok(())
}
