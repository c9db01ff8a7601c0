//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request to backend:
//!     → timeouts.rs (fixed deadline + cancellation token)
//!     → Ok(response) | DeadlineExceeded | Cancelled | Transport
//!     → Expiry (same deadline + token, polled by the response body)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every backend call has a deadline
//! - No retries and no failover: a failed forward is terminal for that request

pub mod timeouts;

pub use timeouts::{Expiry, ForwardContext, ForwardError};
