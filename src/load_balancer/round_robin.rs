//! Round-robin load balancing strategy.

use std::num::NonZeroUsize;
use std::sync::Mutex;

use crate::load_balancer::LoadBalancer;

/// Round-robin selector.
/// Holds a cursor that always stays in `0..len`.
#[derive(Debug, Default)]
pub struct RoundRobin {
    cursor: Mutex<usize>,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current cursor position (the index the next call will return).
    pub fn cursor(&self) -> usize {
        *self.cursor.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl LoadBalancer for RoundRobin {
    fn next_index(&self, len: NonZeroUsize) -> usize {
        let len = len.get();
        // A poisoned cursor is still a valid index; keep rotating.
        let mut cursor = self.cursor.lock().unwrap_or_else(|e| e.into_inner());
        let index = *cursor % len;
        *cursor = (index + 1) % len;
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;

    fn len(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    #[test]
    fn test_round_robin() {
        let lb = RoundRobin::new();

        assert_eq!(lb.next_index(len(2)), 0);
        assert_eq!(lb.next_index(len(2)), 1);
        assert_eq!(lb.next_index(len(2)), 0);
        assert_eq!(lb.cursor(), 1);
    }

    #[test]
    fn test_fairness_over_multiple_cycles() {
        let lb = RoundRobin::new();

        let picks: Vec<_> = (0..9).map(|_| lb.next_index(len(3))).collect();
        assert_eq!(picks, vec![0, 1, 2, 0, 1, 2, 0, 1, 2]);
        assert_eq!(lb.cursor(), 0);
    }

    #[test]
    fn test_single_backend() {
        let lb = RoundRobin::new();
        for _ in 0..3 {
            assert_eq!(lb.next_index(len(1)), 0);
        }
        assert_eq!(lb.cursor(), 0);
    }

    #[test]
    fn test_concurrent_rotation_is_exact() {
        let lb = Arc::new(RoundRobin::new());
        let threads = 8;
        let per_thread = 100;

        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let lb = lb.clone();
                std::thread::spawn(move || {
                    (0..per_thread)
                        .map(|_| lb.next_index(len(4)))
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut counts: HashMap<usize, usize> = HashMap::new();
        for handle in handles {
            for index in handle.join().unwrap() {
                *counts.entry(index).or_default() += 1;
            }
        }

        assert_eq!(counts.len(), 4);
        for count in counts.values() {
            assert_eq!(*count, threads * per_thread / 4);
        }
        assert_eq!(lb.cursor(), 0);
    }
}
