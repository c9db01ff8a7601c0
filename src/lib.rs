//! Round-robin HTTP reverse proxy library.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ───────────────▶ http::server ──▶ http::proxy ──▶ routing::Router
//!                                            │               │
//!                                            │               ▼
//!                                            │      load_balancer::BackendPool
//!                                            ▼
//!                              resilience::ForwardContext ──▶ Backend
//!                                            │
//!     Client Response ◀── http::recorder ◀───┘
//!                                            │
//!                    observability::{MetricsAggregator, RequestJournal}
//!                                            │
//!                          admin: GET /metrics, GET /requests
//! ```

pub mod admin;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod load_balancer;
pub mod observability;
pub mod resilience;
pub mod routing;

pub use config::schema::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
