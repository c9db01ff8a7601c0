//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Forwarding engine produces:
//!     → logging.rs (structured log events)
//!     → metrics.rs (aggregate counters)
//!     → journal.rs (one record per request)
//!
//! Consumers:
//!     → stdout (tracing subscriber)
//!     → GET /metrics (plain-text snapshot)
//!     → GET /requests (JSON journal snapshot)
//! ```
//!
//! # Design Decisions
//! - Aggregator and journal are owned objects, not process globals
//! - Readers copy then release; formatting never holds a lock

pub mod journal;
pub mod logging;
pub mod metrics;

pub use journal::{ErrorClass, JournalQuery, JournalSnapshot, RequestJournal, RequestRecord};
pub use metrics::{MetricsAggregator, MetricsSnapshot};
