use std::net::SocketAddr;

use axum::{extract::State, http::Uri, Router};
use clap::Parser;

/// Minimal backend that echoes the requested path, for trying the proxy locally.
#[derive(Parser)]
#[command(name = "demo-backend")]
struct Cli {
    /// Port to listen on.
    #[arg(short, long, default_value_t = 8081)]
    port: u16,

    /// Name included in every response.
    #[arg(short, long, default_value = "Backend")]
    name: String,
}

async fn echo(State(name): State<String>, uri: Uri) -> String {
    tracing::info!(path = %uri.path(), "Handle request");
    format!("{}: You requested {}\n", name, uri.path())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().init();
    let cli = Cli::parse();

    let app = Router::new().fallback(echo).with_state(cli.name.clone());

    let addr = SocketAddr::from(([127, 0, 0, 1], cli.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(name = %cli.name, address = %addr, "Demo backend listening");

    axum::serve(listener, app).await?;
    Ok(())
}
