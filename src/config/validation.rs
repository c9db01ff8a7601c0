//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Reject empty backend pools and malformed backend URLs
//! - Validate value ranges (timeouts > 0)
//! - Detect duplicate route prefixes and colliding metric labels
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::{is_valid_label, ProxyConfig};

/// A single semantic problem found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid bind address '{0}'")]
    BindAddress(String),

    #[error("route prefix '{0}' must start with '/'")]
    PrefixNotAbsolute(String),

    #[error("route prefix '{0}' is configured more than once")]
    DuplicatePrefix(String),

    #[error("route '{prefix}': name '{name}' may only contain ASCII letters, digits and '_'")]
    InvalidName { prefix: String, name: String },

    #[error("route '{prefix}': label '{label}' is already used by another route")]
    DuplicateLabel { prefix: String, label: String },

    #[error("route '{0}' has no backends")]
    EmptyPool(String),

    #[error("route '{prefix}': invalid backend '{backend}': {reason}")]
    InvalidBackend {
        prefix: String,
        backend: String,
        reason: String,
    },

    #[error("timeouts.forward_secs must be greater than zero")]
    ZeroForwardTimeout,
}

/// Check a configuration for semantic errors.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    if config.timeouts.forward_secs == 0 {
        errors.push(ValidationError::ZeroForwardTimeout);
    }

    let mut seen = HashSet::new();
    let mut labels = HashSet::new();
    for route in &config.routes {
        let prefix = &route.path_prefix;
        if !prefix.starts_with('/') {
            errors.push(ValidationError::PrefixNotAbsolute(prefix.clone()));
        }
        if !seen.insert(prefix.as_str()) {
            errors.push(ValidationError::DuplicatePrefix(prefix.clone()));
        } else {
            let label = route.label();
            if !is_valid_label(&label) {
                errors.push(ValidationError::InvalidName {
                    prefix: prefix.clone(),
                    name: label,
                });
            } else if !labels.insert(label.clone()) {
                errors.push(ValidationError::DuplicateLabel {
                    prefix: prefix.clone(),
                    label,
                });
            }
        }
        if route.backends.is_empty() {
            errors.push(ValidationError::EmptyPool(prefix.clone()));
        }
        for backend in &route.backends {
            if let Err(reason) = check_backend_url(backend) {
                errors.push(ValidationError::InvalidBackend {
                    prefix: prefix.clone(),
                    backend: backend.clone(),
                    reason,
                });
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// A backend is a plain `http://host[:port]` base URL with no path.
pub(crate) fn check_backend_url(raw: &str) -> Result<Url, String> {
    let url = Url::parse(raw).map_err(|e| e.to_string())?;
    if url.scheme() != "http" {
        return Err(format!("unsupported scheme '{}'", url.scheme()));
    }
    if url.host_str().is_none() {
        return Err("missing host".to_string());
    }
    if url.path() != "/" || url.query().is_some() {
        return Err("backend URL must not carry a path or query".to_string());
    }
    Ok(url)
}
