//! Introspection endpoints served next to the proxy.

pub mod handlers;

use axum::{routing::get, Router};

use self::handlers::*;
use crate::http::server::AppState;

pub fn setup_admin_router() -> Router<AppState> {
    Router::new()
        .route("/metrics", get(get_metrics))
        .route("/requests", get(get_requests))
}
