//! Client affinity routing.
//!
//! Stickiness falls out of hashing a stable client identifier over a
//! stable snapshot order; there is no session table. When the healthy set
//! changes, the index space changes with it and a client may move to a
//! different backend. This is a plain modulo hash, not a consistent-hash
//! ring.

use std::hash::{DefaultHasher, Hasher};
use std::sync::Arc;

use crate::load_balancer::{
    backend::Backend,
    error::{LoadBalancerError, LoadBalancerResult},
    pool::BackendPool,
};

/// Hash `client_id` into `0..n`.
///
/// `DefaultHasher::new()` uses fixed keys, so the result is stable for the
/// life of the process (and across processes built with the same std).
///
/// # Panics
/// Panics if `n` is zero.
pub fn affinity_index(client_id: &str, n: usize) -> usize {
    let mut hasher = DefaultHasher::new();
    hasher.write(client_id.as_bytes());
    (hasher.finish() % n as u64) as usize
}

/// Pick the backend for `client_id` out of an already-taken snapshot.
pub fn select_from(snapshot: &[Backend], client_id: &str) -> Option<Backend> {
    if snapshot.is_empty() {
        return None;
    }
    Some(snapshot[affinity_index(client_id, snapshot.len())].clone())
}

/// Selects a healthy backend for a client identifier.
#[derive(Debug, Clone)]
pub struct AffinityRouter {
    pool: Arc<BackendPool>,
}

impl AffinityRouter {
    pub fn new(pool: Arc<BackendPool>) -> Self {
        Self { pool }
    }

    /// The pool this router reads from.
    pub fn pool(&self) -> &Arc<BackendPool> {
        &self.pool
    }

    /// Select a backend for `client_id`, or `None` when nothing is healthy.
    pub fn select(&self, client_id: &str) -> Option<Backend> {
        let snapshot = self.pool.snapshot_healthy();
        select_from(&snapshot, client_id)
    }

    /// Like [`select`](Self::select) but reports the empty case as an error.
    pub fn try_select(&self, client_id: &str) -> LoadBalancerResult<Backend> {
        self.select(client_id).ok_or(LoadBalancerError::NoHealthyBackend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, HashSet};

    fn router(n: usize) -> AffinityRouter {
        let urls = (0..n).map(|i| format!("http://127.0.0.1:{}", 9000 + i));
        AffinityRouter::new(Arc::new(BackendPool::new(urls)))
    }

    #[test]
    fn test_select_is_deterministic() {
        let r = router(3);
        for i in 0..50 {
            let client = format!("10.0.0.{}", i);
            let first = r.select(&client).unwrap();
            let second = r.select(&client).unwrap();
            assert_eq!(first, second);
        }
    }

    #[test]
    fn test_every_index_reachable() {
        for n in 1..=8 {
            let hit: HashSet<usize> = (0..2000)
                .map(|i| affinity_index(&format!("client-{}", i), n))
                .collect();
            assert_eq!(hit, (0..n).collect::<HashSet<_>>(), "n = {}", n);
        }
    }

    #[test]
    fn test_distribution_not_degenerate() {
        let r = router(3);
        let mut counts: HashMap<String, usize> = HashMap::new();
        for i in 0..100 {
            let b = r.select(&format!("192.168.1.{}", i)).unwrap();
            *counts.entry(b.url).or_default() += 1;
        }
        assert!(counts.len() > 1, "all clients landed on one backend: {:?}", counts);
        assert!(counts.values().all(|&c| c < 100));
    }

    #[test]
    fn test_none_when_no_backend_healthy() {
        let r = router(2);
        for b in r.pool().backends() {
            r.pool().set_health(&b.url, false);
        }
        assert!(r.select("10.0.0.1").is_none());
        assert_eq!(r.try_select("10.0.0.1"), Err(LoadBalancerError::NoHealthyBackend));
    }

    #[test]
    fn test_only_healthy_backends_selected() {
        let r = router(3);
        r.pool().set_health("http://127.0.0.1:9001", false);
        for i in 0..100 {
            let b = r.select(&format!("c{}", i)).unwrap();
            assert_ne!(b.url, "http://127.0.0.1:9001");
            assert!(b.healthy);
        }
    }

    #[test]
    fn test_stable_while_healthy_set_unchanged() {
        let r = router(3);
        let before = r.select("203.0.113.7").unwrap();

        // Flapping a backend and restoring it gives the same snapshot back.
        r.pool().set_health("http://127.0.0.1:9002", false);
        r.pool().set_health("http://127.0.0.1:9002", true);

        assert_eq!(r.select("203.0.113.7").unwrap(), before);
    }
}
