//! Request handling and transformation.
//!
//! # Responsibilities
//! - Substitute the backend's scheme and authority into the request URI
//! - Preserve method, path, query, headers and the streamed body
//! - Strip hop-by-hop headers and append `X-Forwarded-For`
//!
//! # Design Decisions
//! - Host substitution only; the path is never rewritten
//! - The inbound `Host` header is forwarded untouched
//! - Outbound requests are always HTTP/1.1

use std::net::SocketAddr;

use axum::body::Body;
use axum::http::{
    header::{self, HeaderMap, HeaderName, HeaderValue},
    uri::PathAndQuery,
    Request, Uri, Version,
};

use crate::load_balancer::Backend;

pub const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Headers that apply to a single transport hop and must not be forwarded.
const HOP_BY_HOP: [&str; 9] = [
    "connection",
    "proxy-connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Remove hop-by-hop headers, including any named in `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in listed {
        headers.remove(name);
    }
    for name in HOP_BY_HOP {
        headers.remove(name);
    }
}

/// Rebuild `original` against `backend`, keeping path and query.
pub fn upstream_uri(original: &Uri, backend: &Backend) -> Result<Uri, axum::http::Error> {
    let path_and_query = original
        .path_and_query()
        .cloned()
        .unwrap_or_else(|| PathAndQuery::from_static("/"));

    Uri::builder()
        .scheme(backend.scheme.clone())
        .authority(backend.authority.clone())
        .path_and_query(path_and_query)
        .build()
}

/// Turn an inbound request into the request sent to `backend`.
pub fn build_upstream_request(
    request: Request<Body>,
    backend: &Backend,
    peer: Option<SocketAddr>,
) -> Result<Request<Body>, axum::http::Error> {
    let (mut parts, body) = request.into_parts();

    parts.uri = upstream_uri(&parts.uri, backend)?;
    parts.version = Version::HTTP_11;
    strip_hop_by_hop(&mut parts.headers);

    if let Some(peer) = peer {
        append_forwarded_for(&mut parts.headers, peer);
    }

    Ok(Request::from_parts(parts, body))
}

fn append_forwarded_for(headers: &mut HeaderMap, peer: SocketAddr) {
    let client = peer.ip().to_string();
    let value = match headers.get(X_FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
        Some(prior) if !prior.is_empty() => format!("{}, {}", prior, client),
        _ => client,
    };
    if let Ok(value) = HeaderValue::from_str(&value) {
        headers.insert(X_FORWARDED_FOR, value);
    }
}
