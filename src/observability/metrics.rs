//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): every request that reached the proxy handler
//! - `proxy_errors_total` (counter): requests classified as an error
//! - `proxy_requests_<route>` (counter): requests matched to a route
//! - `proxy_status_code_total{code="..."}` (counter): final status codes
//!
//! # Design Decisions
//! - Global counters are atomics, maps each sit behind their own lock
//! - Snapshots copy under lock and format after releasing it
//! - Counters are eventually consistent with each other, not transactional

use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Concurrent-safe proxy counters.
#[derive(Debug, Default)]
pub struct MetricsAggregator {
    total_requests: AtomicU64,
    total_errors: AtomicU64,
    route_requests: Mutex<HashMap<String, u64>>,
    status_codes: Mutex<HashMap<u16, u64>>,
}

impl MetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count an incoming request and return its 1-based sequence number.
    pub fn record_request(&self) -> u64 {
        self.total_requests.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Count a request matched to `route`.
    pub fn record_route(&self, route: &str) {
        let mut routes = self.route_requests.lock().unwrap_or_else(|e| e.into_inner());
        *routes.entry(route.to_string()).or_default() += 1;
    }

    /// Count a final status code.
    pub fn record_status(&self, code: u16) {
        let mut codes = self.status_codes.lock().unwrap_or_else(|e| e.into_inner());
        *codes.entry(code).or_default() += 1;
    }

    /// Count an error together with the status code it was surfaced as.
    pub fn record_error(&self, code: u16) {
        self.total_errors.fetch_add(1, Ordering::SeqCst);
        self.record_status(code);
    }

    pub fn total_requests(&self) -> u64 {
        self.total_requests.load(Ordering::SeqCst)
    }

    pub fn total_errors(&self) -> u64 {
        self.total_errors.load(Ordering::SeqCst)
    }

    /// Copy all counters. Each map lock is held only for the copy.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let total_requests = self.total_requests();
        let total_errors = self.total_errors();

        let route_requests: BTreeMap<String, u64> = {
            let routes = self.route_requests.lock().unwrap_or_else(|e| e.into_inner());
            routes
                .iter()
                .filter(|(_, count)| **count > 0)
                .map(|(k, v)| (k.clone(), *v))
                .collect()
        };

        let status_codes: BTreeMap<u16, u64> = {
            let codes = self.status_codes.lock().unwrap_or_else(|e| e.into_inner());
            codes.iter().map(|(k, v)| (*k, *v)).collect()
        };

        MetricsSnapshot {
            total_requests,
            total_errors,
            route_requests,
            status_codes,
        }
    }
}

/// A point-in-time copy of all counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub total_requests: u64,
    pub total_errors: u64,
    pub route_requests: BTreeMap<String, u64>,
    pub status_codes: BTreeMap<u16, u64>,
}

impl MetricsSnapshot {
    /// Requests counted for `route` (0 if never matched).
    pub fn route(&self, route: &str) -> u64 {
        self.route_requests.get(route).copied().unwrap_or(0)
    }

    /// Occurrences of status `code` (0 if never observed).
    pub fn status(&self, code: u16) -> u64 {
        self.status_codes.get(&code).copied().unwrap_or(0)
    }

    /// Render as plain-text `key value` lines.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "proxy_requests_total {}", self.total_requests);
        let _ = writeln!(out, "proxy_errors_total {}", self.total_errors);
        for (route, count) in &self.route_requests {
            let _ = writeln!(out, "proxy_requests_{} {}", route, count);
        }
        for (code, count) in &self.status_codes {
            let _ = writeln!(out, "proxy_status_code_total{{code=\"{}\"}} {}", code, count);
        }
        out
    }
}
