//! In-memory request journal.
//!
//! # Responsibilities
//! - Keep one record per proxied request, visible from the moment it arrives
//! - Apply the backend assignment and the final outcome to that record
//! - Serve ordered, filterable snapshots to the `/requests` endpoint
//!
//! # Design Decisions
//! - Records are keyed by request id, so snapshots are always in arrival order
//!   even when concurrent inserts land out of order
//! - Retention keeps the most recent `max_records`; 0 disables eviction
//! - One lock for the whole map, never held across I/O

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Outcome class of a failed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// No configured prefix matched the path.
    NoRoute,
    /// The forwarding deadline elapsed before the backend answered.
    GatewayTimeout,
    /// Any other transport failure reaching the backend.
    BadGateway,
    /// Client disconnect or server shutdown aborted the forward.
    Cancelled,
}

/// Lifecycle state of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordState {
    Pending,
    Complete,
}

/// One proxied request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestRecord {
    pub id: u64,
    pub method: String,
    pub path: String,
    pub route: Option<String>,
    pub backend: Option<String>,
    /// Wall-clock start, milliseconds since the Unix epoch.
    pub start_time_ms: u64,
    pub duration_ms: Option<f64>,
    pub status_code: Option<u16>,
    pub error: Option<ErrorClass>,
    pub error_detail: Option<String>,
    pub state: RecordState,
}

impl RequestRecord {
    fn pending(id: u64, method: &str, path: &str) -> Self {
        let start_time_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        Self {
            id,
            method: method.to_string(),
            path: path.to_string(),
            route: None,
            backend: None,
            start_time_ms,
            duration_ms: None,
            status_code: None,
            error: None,
            error_detail: None,
            state: RecordState::Pending,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.state == RecordState::Pending
    }
}

/// Final outcome applied to a record.
#[derive(Debug, Clone)]
pub struct Outcome {
    pub status: u16,
    pub duration: Duration,
    pub error: Option<(ErrorClass, String)>,
}

/// Filters accepted by the `/requests` endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct JournalQuery {
    /// Only the most recent `limit` matching records.
    pub limit: Option<usize>,
    /// Only records for this route label.
    pub route: Option<String>,
    /// Only records that ended in an error.
    pub errors: bool,
}

impl JournalQuery {
    fn accepts(&self, record: &RequestRecord) -> bool {
        if self.errors && record.error.is_none() {
            return false;
        }
        match &self.route {
            Some(route) => record.route.as_deref() == Some(route.as_str()),
            None => true,
        }
    }
}

/// Serialized body of the `/requests` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalSnapshot {
    pub total_requests: u64,
    pub total_errors: u64,
    /// Records currently held by the journal (before filtering).
    pub retained: usize,
    pub requests: Vec<RequestRecord>,
}

/// Concurrent-safe request journal.
#[derive(Debug)]
pub struct RequestJournal {
    records: Mutex<BTreeMap<u64, RequestRecord>>,
    max_records: usize,
}

impl RequestJournal {
    /// Create a journal keeping at most `max_records` (0 = unbounded).
    pub fn new(max_records: usize) -> Self {
        Self {
            records: Mutex::new(BTreeMap::new()),
            max_records,
        }
    }

    /// Insert a pending record for a request that just arrived.
    pub fn open(&self, id: u64, method: &str, path: &str) {
        let record = RequestRecord::pending(id, method, path);
        let mut records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        records.insert(id, record);
        if self.max_records > 0 {
            while records.len() > self.max_records {
                if let Some((evicted, _)) = records.pop_first() {
                    tracing::trace!(request_id = evicted, "Journal record evicted");
                }
            }
        }
    }

    /// Record the route and backend chosen for a request.
    pub fn assign(&self, id: u64, route: &str, backend: &str) {
        self.update(id, |record| {
            record.route = Some(route.to_string());
            record.backend = Some(backend.to_string());
        });
    }

    /// Finalize a request. The record is stable afterwards.
    pub fn complete(&self, id: u64, outcome: Outcome) {
        self.update(id, |record| {
            record.duration_ms = Some(outcome.duration.as_micros() as f64 / 1000.0);
            record.status_code = Some(outcome.status);
            if let Some((class, detail)) = outcome.error {
                record.error = Some(class);
                record.error_detail = Some(detail);
            }
            record.state = RecordState::Complete;
        });
    }

    fn update(&self, id: u64, f: impl FnOnce(&mut RequestRecord)) {
        let mut records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        match records.get_mut(&id) {
            Some(record) if record.state != RecordState::Complete => f(record),
            Some(_) => tracing::warn!(request_id = id, "Ignoring update to finalized record"),
            // Evicted while in flight.
            None => {}
        }
    }

    /// Copy of a single record.
    pub fn get(&self, id: u64) -> Option<RequestRecord> {
        let records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        records.get(&id).cloned()
    }

    /// Copy of every retained record, ordered by id.
    pub fn snapshot(&self) -> Vec<RequestRecord> {
        let records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        records.values().cloned().collect()
    }

    /// Filtered copy, ordered by id. Also returns the number of retained records.
    pub fn query(&self, query: &JournalQuery) -> (Vec<RequestRecord>, usize) {
        let (mut matched, retained) = {
            let records = self.records.lock().unwrap_or_else(|e| e.into_inner());
            let matched: Vec<_> = records
                .values()
                .filter(|r| query.accepts(r))
                .cloned()
                .collect();
            (matched, records.len())
        };

        if let Some(limit) = query.limit {
            let skip = matched.len().saturating_sub(limit);
            matched.drain(..skip);
        }
        (matched, retained)
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
