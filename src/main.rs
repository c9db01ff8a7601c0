//! Round-robin HTTP reverse proxy.
//!
//! Routes requests by path prefix to rotating backend pools, bounds every
//! forward with a deadline, and exposes `/metrics` and `/requests`.

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use http_proxy::config::load_config;
use http_proxy::lifecycle::signals::wait_for_signal;
use http_proxy::observability::logging::init_logging;
use http_proxy::{HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "http-proxy")]
#[command(about = "Round-robin HTTP reverse proxy", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "proxy.toml")]
    config: PathBuf,

    /// Override the listener bind address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = load_config(&cli.config)?;
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }

    init_logging(&config.observability)?;

    tracing::info!("http-proxy v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        config = %cli.config.display(),
        bind_address = %config.listener.bind_address,
        routes = config.routes.len(),
        forward_timeout_secs = config.timeouts.forward_secs,
        "Configuration loaded"
    );

    let server = HttpServer::new(config)?;

    let listener = TcpListener::bind(&server.config().listener.bind_address).await?;
    tracing::info!(
        address = %listener.local_addr()?,
        "Listening for connections"
    );

    let shutdown = Shutdown::new();
    tokio::spawn(wait_for_signal(shutdown.clone()));

    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
