//! Forwarding engine.
//!
//! # Data Flow
//! ```text
//! request → count + journal (pending)
//!     → route lookup            (none: 404, no_route)
//!     → pool.next()             (route counter, journal backend)
//!     → ForwardContext::run     (deadline, shutdown token, client drop)
//!     → StatusRecorder          (status observed, response untouched)
//!     → ForwardBody             (same deadline and token while streaming)
//!     → metrics + journal final (when the body ends or fails)
//! ```
//!
//! A failed forward is terminal: no retries, no failover to another backend.
//! The deadline covers the whole exchange: a backend that sends headers and
//! then stalls is cut off when it expires, and the record ends as a timeout.

use std::fmt::Display;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
};
use hyper::body::{Body as HttpBody, Bytes, Frame, SizeHint};

use crate::http::recorder::StatusRecorder;
use crate::http::request::build_upstream_request;
use crate::http::response::{from_upstream, ProxyError};
use crate::http::server::AppState;
use crate::observability::journal::Outcome;
use crate::load_balancer::Backend;
use crate::observability::{ErrorClass, MetricsAggregator, RequestJournal};
use crate::resilience::{Expiry, ForwardContext, ForwardError};

/// Status recorded when the client goes away before the response completes.
pub const CLIENT_CLOSED_REQUEST: u16 = 499;

/// Axum entry point for every path not claimed by the introspection endpoints.
pub async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    forward(&state, request).await
}

/// Proxy one request and account for its outcome.
pub async fn forward(state: &AppState, request: Request<Body>) -> Response {
    let ctx = ForwardContext::new(state.forward_timeout, state.shutdown.child_token());
    let id = state.metrics.record_request();
    let path = request.uri().path().to_string();
    let method = request.method().clone();

    state.journal.open(id, method.as_str(), &path);
    let flight = InFlight::new(id, state.metrics.clone(), state.journal.clone());
    let mut recorder = StatusRecorder::new();

    let route = match state.router.match_path(&path) {
        Some(route) => route,
        None => {
            tracing::warn!(request_id = id, method = %method, path = %path, "No route matched");
            let response = recorder.record_override(ProxyError::NoRoute.into_response());
            flight.fail(recorder.status(), ProxyError::NoRoute.class(), "no route matched".into());
            return response;
        }
    };

    let backend = route.pool().next();
    state.metrics.record_route(route.name());
    state.journal.assign(id, route.name(), backend.address());

    tracing::debug!(
        request_id = id,
        method = %method,
        path = %path,
        route = %route.name(),
        backend = %backend,
        "Proxying request"
    );

    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    let outbound = match build_upstream_request(request, &backend, peer) {
        Ok(req) => req,
        Err(e) => {
            tracing::error!(request_id = id, backend = %backend, error = %e, "Failed to build upstream request");
            let err = ProxyError::BadGateway;
            let response = recorder.record_override(err.into_response());
            flight.fail(recorder.status(), err.class(), e.to_string());
            return response;
        }
    };

    match ctx.run(state.client.request(outbound)).await {
        Ok(upstream) => {
            let upstream = recorder.record(upstream);
            let status = recorder.status();
            tracing::debug!(
                request_id = id,
                backend = %backend,
                status = status.as_u16(),
                "Backend responded"
            );
            let expiry = ctx.expiry();
            from_upstream(upstream.map(move |body| {
                ForwardBody::new(body, expiry, flight, status, path, backend)
            }))
        }
        Err(e) => {
            let err = ProxyError::from(&e);
            tracing::error!(
                request_id = id,
                path = %path,
                backend = %backend,
                error = %e,
                status = err.status_code().as_u16(),
                "Proxy error"
            );
            let response = recorder.record_override(err.into_response());
            flight.fail(recorder.status(), err.class(), e.to_string());
            response
        }
    }
}

/// Backend response body on its way to the client.
///
/// Keeps the forward's deadline and shutdown token armed until the last
/// frame, and owns the request's [`InFlight`] so the outcome is recorded when
/// the stream ends, fails or is dropped.
struct ForwardBody<B> {
    inner: B,
    expiry: Expiry,
    flight: Option<InFlight>,
    status: StatusCode,
    /// Bytes still expected when the backend announced a length.
    remaining: Option<u64>,
    path: String,
    backend: Arc<Backend>,
}

impl<B> ForwardBody<B>
where
    B: HttpBody<Data = Bytes> + Unpin,
    B::Error: Display,
{
    fn new(
        inner: B,
        expiry: Expiry,
        flight: InFlight,
        status: StatusCode,
        path: String,
        backend: Arc<Backend>,
    ) -> Self {
        let remaining = inner.size_hint().exact();
        let mut body = Self {
            inner,
            expiry,
            flight: Some(flight),
            status,
            remaining,
            path,
            backend,
        };
        // Bodiless responses may never be polled.
        if body.inner.is_end_stream() || body.remaining == Some(0) {
            body.finish();
        }
        body
    }

    fn finish(&mut self) {
        if let Some(flight) = self.flight.take() {
            let id = flight.id;
            let elapsed = flight.succeed(self.status);
            tracing::info!(
                request_id = id,
                path = %self.path,
                backend = %self.backend,
                status = self.status.as_u16(),
                elapsed_ms = elapsed.as_millis() as u64,
                "Proxied request"
            );
        }
    }

    fn abort(&mut self, err: &ForwardError) {
        if let Some(flight) = self.flight.take() {
            let proxy_err = ProxyError::from(err);
            tracing::error!(
                request_id = flight.id,
                path = %self.path,
                backend = %self.backend,
                error = %err,
                status = proxy_err.status_code().as_u16(),
                "Response body aborted"
            );
            flight.fail(
                proxy_err.status_code(),
                proxy_err.class(),
                format!("response body: {}", err),
            );
        }
    }
}

impl<B> HttpBody for ForwardBody<B>
where
    B: HttpBody<Data = Bytes> + Unpin,
    B::Error: Display,
{
    type Data = Bytes;
    type Error = ForwardError;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Bytes>, ForwardError>>> {
        let this = self.get_mut();
        if this.flight.is_none() {
            return Poll::Ready(None);
        }

        if let Poll::Ready(err) = this.expiry.poll_expired(cx) {
            this.abort(&err);
            return Poll::Ready(Some(Err(err)));
        }

        match Pin::new(&mut this.inner).poll_frame(cx) {
            Poll::Ready(Some(Ok(frame))) => {
                if let (Some(data), Some(remaining)) = (frame.data_ref(), this.remaining.as_mut()) {
                    *remaining = remaining.saturating_sub(data.len() as u64);
                }
                if this.inner.is_end_stream() || this.remaining == Some(0) {
                    this.finish();
                }
                Poll::Ready(Some(Ok(frame)))
            }
            Poll::Ready(Some(Err(e))) => {
                let err = ForwardError::Transport(e.to_string());
                this.abort(&err);
                Poll::Ready(Some(Err(err)))
            }
            Poll::Ready(None) => {
                this.finish();
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }

    fn is_end_stream(&self) -> bool {
        self.flight.is_none() || self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

/// Accounting for one request between arrival and its final outcome.
///
/// Dropping it unfinished means the handler future was dropped, i.e. the
/// client disconnected mid-forward; the record is then closed as cancelled.
struct InFlight {
    id: u64,
    started: Instant,
    metrics: Arc<MetricsAggregator>,
    journal: Arc<RequestJournal>,
    finished: bool,
}

impl InFlight {
    fn new(id: u64, metrics: Arc<MetricsAggregator>, journal: Arc<RequestJournal>) -> Self {
        Self {
            id,
            started: Instant::now(),
            metrics,
            journal,
            finished: false,
        }
    }

    fn succeed(mut self, status: StatusCode) -> std::time::Duration {
        let duration = self.started.elapsed();
        self.metrics.record_status(status.as_u16());
        self.journal.complete(
            self.id,
            Outcome {
                status: status.as_u16(),
                duration,
                error: None,
            },
        );
        self.finished = true;
        duration
    }

    fn fail(mut self, status: StatusCode, class: ErrorClass, detail: String) {
        self.close_with_error(status.as_u16(), class, detail);
    }

    fn close_with_error(&mut self, status: u16, class: ErrorClass, detail: String) {
        self.metrics.record_error(status);
        self.journal.complete(
            self.id,
            Outcome {
                status,
                duration: self.started.elapsed(),
                error: Some((class, detail)),
            },
        );
        self.finished = true;
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if !self.finished {
            tracing::warn!(request_id = self.id, "Client disconnected before the response completed");
            self.close_with_error(
                CLIENT_CLOSED_REQUEST,
                ErrorClass::Cancelled,
                "client disconnected".into(),
            );
        }
    }
}
