//! Backend abstraction.
//!
//! # Responsibilities
//! - Represent a single upstream server by its base URL
//! - Pre-compute the URI scheme and authority used when forwarding

use std::fmt;

use axum::http::uri::{Authority, Scheme};

use crate::config::validation::check_backend_url;

/// A single backend server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backend {
    /// Base URL as configured, without trailing slash (e.g. "http://localhost:8081").
    address: String,
    /// Scheme substituted into forwarded URIs.
    pub scheme: Scheme,
    /// Authority (host:port) substituted into forwarded URIs.
    pub authority: Authority,
}

impl Backend {
    /// Parse a backend from its base URL.
    pub fn parse(raw: &str) -> Result<Self, String> {
        let base_url = check_backend_url(raw)?;
        let host = base_url.host_str().ok_or("missing host")?;
        let authority = match base_url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };
        let authority = authority
            .parse::<Authority>()
            .map_err(|e| e.to_string())?;
        let address = format!("{}://{}", base_url.scheme(), authority);

        Ok(Self {
            address,
            scheme: Scheme::HTTP,
            authority,
        })
    }

    /// The address reported in logs, metrics and the journal.
    pub fn address(&self) -> &str {
        &self.address
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_backend() {
        let b = Backend::parse("http://127.0.0.1:8081").unwrap();
        assert_eq!(b.address(), "http://127.0.0.1:8081");
        assert_eq!(b.authority.as_str(), "127.0.0.1:8081");
        assert_eq!(b.scheme, Scheme::HTTP);

        let trailing = Backend::parse("http://localhost:8082/").unwrap();
        assert_eq!(trailing.to_string(), "http://localhost:8082");
    }

    #[test]
    fn test_default_port_omitted() {
        let b = Backend::parse("http://backend.internal").unwrap();
        assert_eq!(b.authority.as_str(), "backend.internal");
    }

    #[test]
    fn test_rejects_invalid() {
        assert!(Backend::parse("ftp://localhost").is_err());
        assert!(Backend::parse("http://localhost:8081/prefix").is_err());
    }
}
