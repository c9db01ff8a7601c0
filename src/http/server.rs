//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Validate configuration and compile the route table
//! - Create Axum Router with introspection endpoints and proxy fallback
//! - Wire up middleware (tracing)
//! - Serve on a listener until shutdown, then cancel in-flight forwards

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{body::Body, Router};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::admin;
use crate::config::{validate_config, ConfigError, ProxyConfig};
use crate::http::proxy::proxy_handler;
use crate::observability::{MetricsAggregator, RequestJournal};
use crate::routing::{RouteError, Router as ProxyRouter};

/// Errors raised while building the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Route(#[from] RouteError),
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub router: Arc<ProxyRouter>,
    pub client: Client<HttpConnector, Body>,
    pub metrics: Arc<MetricsAggregator>,
    pub journal: Arc<RequestJournal>,
    pub forward_timeout: Duration,
    /// Cancelled when the server shuts down; each forward gets a child.
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Build state from an already validated configuration.
    pub fn from_config(config: &ProxyConfig) -> Result<Self, RouteError> {
        let router = Arc::new(ProxyRouter::from_config(&config.routes)?);

        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        Ok(Self {
            router,
            client,
            metrics: Arc::new(MetricsAggregator::new()),
            journal: Arc::new(RequestJournal::new(config.journal.max_records)),
            forward_timeout: Duration::from_secs(config.timeouts.forward_secs),
            shutdown: CancellationToken::new(),
        })
    }
}

/// HTTP server for the proxy.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
    state: AppState,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    ///
    /// Configuration errors (including empty backend pools) are reported here,
    /// before any traffic is accepted.
    pub fn new(config: ProxyConfig) -> Result<Self, ServerError> {
        validate_config(&config).map_err(ConfigError::Validation)?;
        let state = AppState::from_config(&config)?;

        tracing::info!(
            routes = state.router.routes().len(),
            forward_timeout_secs = config.timeouts.forward_secs,
            journal_max_records = config.journal.max_records,
            "Proxy state initialized"
        );

        let router = Self::build_router(state.clone());
        Ok(Self {
            router,
            config,
            state,
        })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .merge(admin::setup_admin_router())
            .fallback(proxy_handler)
            .with_state(state)
            .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
    }

    /// Run the server, accepting connections on the given listener until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: CancellationToken,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            "HTTP server starting"
        );

        let forwards = self.state.shutdown.clone();
        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown.cancelled().await;
                tracing::info!("Draining connections");
                forwards.cancel();
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// The Axum router, for in-process use.
    pub fn app(&self) -> Router {
        self.router.clone()
    }

    /// Shared state (metrics, journal, routes).
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }
}
