//! Response handling and transformation.
//!
//! # Responsibilities
//! - Convert the backend response into a streamed client response
//!   (the body wrapper that enforces the deadline lives in proxy.rs)
//! - Strip hop-by-hop headers
//! - Map proxy failures to HTTP status codes
//!
//! # Design Decisions
//! - Streaming responses avoid buffering entire body
//! - Backend timeouts result in 504 Gateway Timeout
//! - Other transport failures result in 502 Bad Gateway

use axum::{
    body::Body,
    http::{header, Response, StatusCode},
    response::IntoResponse,
    BoxError,
};
use hyper::body::{Body as HttpBody, Bytes};
use thiserror::Error;

use crate::http::request::strip_hop_by_hop;
use crate::observability::ErrorClass;
use crate::resilience::ForwardError;

/// Failures surfaced to the client by the proxy itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ProxyError {
    #[error("No matching route found")]
    NoRoute,

    #[error("Proxy Timeout")]
    GatewayTimeout,

    #[error("Proxy Error")]
    BadGateway,

    #[error("Proxy Shutting Down")]
    ShuttingDown,
}

impl ProxyError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ProxyError::NoRoute => StatusCode::NOT_FOUND,
            ProxyError::GatewayTimeout => StatusCode::GATEWAY_TIMEOUT,
            ProxyError::BadGateway => StatusCode::BAD_GATEWAY,
            ProxyError::ShuttingDown => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Journal classification for this failure.
    pub fn class(&self) -> ErrorClass {
        match self {
            ProxyError::NoRoute => ErrorClass::NoRoute,
            ProxyError::GatewayTimeout => ErrorClass::GatewayTimeout,
            ProxyError::BadGateway => ErrorClass::BadGateway,
            ProxyError::ShuttingDown => ErrorClass::Cancelled,
        }
    }
}

impl From<&ForwardError> for ProxyError {
    fn from(err: &ForwardError) -> Self {
        match err {
            ForwardError::DeadlineExceeded(_) => ProxyError::GatewayTimeout,
            ForwardError::Cancelled => ProxyError::ShuttingDown,
            ForwardError::Transport(_) => ProxyError::BadGateway,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> axum::response::Response {
        (
            self.status_code(),
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            format!("{}\n", self),
        )
            .into_response()
    }
}

/// Wrap a backend response for the client, streaming its body.
pub fn from_upstream<B>(response: Response<B>) -> Response<Body>
where
    B: HttpBody<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    let (mut parts, body) = response.into_parts();
    strip_hop_by_hop(&mut parts.headers);
    Response::from_parts(parts, Body::new(body))
}
