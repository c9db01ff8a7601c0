//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Route matched → route's BackendPool
//!     → pool.rs (ordered, non-empty backend list)
//!     → round_robin.rs (rotate through backends under a per-pool lock)
//!     → backend.rs (scheme + authority to substitute into the URI)
//! ```
//!
//! # Design Decisions
//! - One pool per route; contention is isolated per route
//! - Empty pools are rejected at construction, never at request time
//! - No health filtering: every configured backend takes its turn

use std::num::NonZeroUsize;

pub mod backend;
pub mod pool;
pub mod round_robin;

pub use backend::Backend;
pub use pool::{BackendPool, PoolError};
pub use round_robin::RoundRobin;

/// Strategy used by a pool to pick the next backend.
pub trait LoadBalancer: Send + Sync + std::fmt::Debug {
    /// Index of the next backend in a pool of `len` backends. Always `< len`.
    fn next_index(&self, len: NonZeroUsize) -> usize;
}
