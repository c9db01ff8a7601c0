//! Backend pool management.
//!
//! # Responsibilities
//! - Own the ordered backend list of one route
//! - Apply the load balancing algorithm to select the next backend
//! - Refuse to exist without backends

use std::num::NonZeroUsize;
use std::sync::Arc;

use thiserror::Error;

use crate::load_balancer::{backend::Backend, round_robin::RoundRobin, LoadBalancer};

/// Error raised when a pool cannot be built.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PoolError {
    #[error("backend pool is empty")]
    Empty,

    #[error("invalid backend '{backend}': {reason}")]
    InvalidBackend { backend: String, reason: String },
}

/// The rotating set of backends serving one route.
#[derive(Debug)]
pub struct BackendPool {
    backends: Vec<Arc<Backend>>,
    size: NonZeroUsize,
    balancer: Box<dyn LoadBalancer>,
}

impl BackendPool {
    /// Create a round-robin pool. Fails if `backends` is empty.
    pub fn new(backends: Vec<Backend>) -> Result<Self, PoolError> {
        let size = NonZeroUsize::new(backends.len()).ok_or(PoolError::Empty)?;
        Ok(Self {
            backends: backends.into_iter().map(Arc::new).collect(),
            size,
            balancer: Box::new(RoundRobin::new()),
        })
    }

    /// Parse backend base URLs and build a pool from them.
    pub fn from_addresses<S: AsRef<str>>(addresses: &[S]) -> Result<Self, PoolError> {
        let backends = addresses
            .iter()
            .map(|raw| {
                Backend::parse(raw.as_ref()).map_err(|reason| PoolError::InvalidBackend {
                    backend: raw.as_ref().to_string(),
                    reason,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(backends)
    }

    /// Select the next backend in rotation.
    pub fn next(&self) -> Arc<Backend> {
        self.backends[self.balancer.next_index(self.size)].clone()
    }

    /// All backends in configured order.
    pub fn backends(&self) -> &[Arc<Backend>] {
        &self.backends
    }

    pub fn len(&self) -> usize {
        self.size.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_pool_rejected() {
        let err = BackendPool::from_addresses::<&str>(&[]).unwrap_err();
        assert_eq!(err, PoolError::Empty);
    }

    #[test]
    fn test_invalid_address_rejected() {
        let err = BackendPool::from_addresses(&["http://ok:1", "bogus"]).unwrap_err();
        assert!(matches!(err, PoolError::InvalidBackend { ref backend, .. } if backend == "bogus"));
    }

    #[test]
    fn test_next_rotates() {
        let pool =
            BackendPool::from_addresses(&["http://localhost:8081", "http://localhost:8082"]).unwrap();
        let seq: Vec<_> = (0..4).map(|_| pool.next().address().to_string()).collect();
        assert_eq!(
            seq,
            vec![
                "http://localhost:8081",
                "http://localhost:8082",
                "http://localhost:8081",
                "http://localhost:8082",
            ]
        );
    }

    #[test]
    fn test_single_backend() {
        let pool = BackendPool::from_addresses(&["http://localhost:8081"]).unwrap();
        assert_eq!(pool.len(), 1);
        for _ in 0..3 {
            assert_eq!(pool.next().address(), "http://localhost:8081");
        }
    }

    #[tokio::test]
    async fn test_concurrent_selection_matches_sequential() {
        let pool = Arc::new(
            BackendPool::from_addresses(&["http://a:1", "http://b:2", "http://c:3"]).unwrap(),
        );

        let mut set = tokio::task::JoinSet::new();
        for _ in 0..300 {
            let pool = pool.clone();
            set.spawn(async move { pool.next().address().to_string() });
        }

        let mut results = Vec::new();
        while let Some(res) = set.join_next().await {
            results.push(res.unwrap());
        }
        results.sort();

        let sequential = BackendPool::from_addresses(&["http://a:1", "http://b:2", "http://c:3"]).unwrap();
        let mut expected: Vec<_> = (0..300).map(|_| sequential.next().address().to_string()).collect();
        expected.sort();

        assert_eq!(results, expected);
    }
}
