//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Route definitions mapping path prefixes to backend pools.
    pub routes: Vec<RouteConfig>,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Request journal retention.
    pub journal: JournalConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Route configuration mapping a path prefix to a pool of backends.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Label used in metrics. Derived from the prefix when absent.
    #[serde(default)]
    pub name: Option<String>,

    /// Path prefix to match (literal, case-sensitive).
    pub path_prefix: String,

    /// Backend base URLs, e.g. "http://127.0.0.1:8081". Rotated in order.
    pub backends: Vec<String>,

    /// Route priority (higher = checked first).
    #[serde(default)]
    pub priority: u32,
}

impl RouteConfig {
    /// Build a route with default name and priority.
    pub fn new(path_prefix: impl Into<String>, backends: Vec<String>) -> Self {
        Self {
            name: None,
            path_prefix: path_prefix.into(),
            backends,
            priority: 0,
        }
    }

    /// Metric label: the explicit `name`, or one derived from the prefix.
    pub fn label(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => label_from_prefix(&self.path_prefix),
        }
    }
}

/// Derive a metric label from a prefix: "/api/" → "api", "/v1/users/" → "v1_users", "/" → "root".
pub fn label_from_prefix(prefix: &str) -> String {
    let label: String = prefix
        .trim_matches('/')
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    if label.is_empty() {
        "root".to_string()
    } else {
        label
    }
}

/// Labels end up inside metric names, so only `[A-Za-z0-9_]` is allowed.
pub fn is_valid_label(label: &str) -> bool {
    !label.is_empty() && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Upper bound for a single backend call, measured from request start.
    pub forward_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { forward_secs: 30 }
    }
}

/// Request journal configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct JournalConfig {
    /// Number of most recent records kept. 0 keeps everything.
    pub max_records: usize,
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            max_records: 10_000,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}
