//! Backend pool management.
//!
//! # Responsibilities
//! - Own the ordered, fixed set of backends
//! - Serialize health updates against healthy-subset reads
//!
//! Membership never changes after construction; only health flags do.

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::load_balancer::backend::Backend;

/// The fixed pool of backends, guarded by a single lock.
#[derive(Debug)]
pub struct BackendPool {
    backends: Mutex<Vec<Backend>>,
}

impl BackendPool {
    /// Create a pool from backend base URLs. Order is significant for routing.
    pub fn new<I, S>(urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let backends = urls.into_iter().map(Backend::new).collect();
        Self {
            backends: Mutex::new(backends),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Backend>> {
        // A panic elsewhere cannot leave a half-written bool behind.
        self.backends.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Currently healthy backends in pool order.
    ///
    /// An empty result means no backend can serve traffic right now.
    pub fn snapshot_healthy(&self) -> Vec<Backend> {
        self.lock().iter().filter(|b| b.healthy).cloned().collect()
    }

    /// Every backend with its current health flag.
    pub fn backends(&self) -> Vec<Backend> {
        self.lock().clone()
    }

    /// Set the health flag of every entry with the given URL.
    ///
    /// Returns `true` if any flag changed. Unknown URLs are ignored.
    pub fn set_health(&self, url: &str, healthy: bool) -> bool {
        let mut backends = self.lock();
        let mut matched = false;
        let mut changed = false;
        for backend in backends.iter_mut().filter(|b| b.url == url) {
            matched = true;
            changed |= backend.healthy != healthy;
            backend.healthy = healthy;
        }
        if !matched {
            tracing::warn!(backend = %url, "Health update for unknown backend ignored");
        }
        changed
    }

    /// Set the health flag of the entry at `index` in pool order.
    ///
    /// Returns `true` if the flag changed. Out-of-range indexes are ignored.
    pub fn set_health_at(&self, index: usize, healthy: bool) -> bool {
        let mut backends = self.lock();
        match backends.get_mut(index) {
            Some(backend) => {
                let changed = backend.healthy != healthy;
                backend.healthy = healthy;
                changed
            }
            None => {
                tracing::warn!(index, "Health update for unknown backend index ignored");
                false
            }
        }
    }

    /// Number of configured backends.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    fn urls() -> Vec<String> {
        (1..=3).map(|i| format!("http://localhost:800{}", i)).collect()
    }

    #[test]
    fn test_all_healthy_at_start() {
        let pool = BackendPool::new(urls());
        assert_eq!(pool.len(), 3);
        let healthy: Vec<_> = pool.snapshot_healthy().into_iter().map(|b| b.url).collect();
        assert_eq!(healthy, urls());
    }

    #[test]
    fn test_unhealthy_backend_excluded_order_preserved() {
        let pool = BackendPool::new(urls());
        assert!(pool.set_health("http://localhost:8002", false));

        let healthy: Vec<_> = pool.snapshot_healthy().into_iter().map(|b| b.url).collect();
        assert_eq!(healthy, vec!["http://localhost:8001", "http://localhost:8003"]);

        // Membership is unchanged.
        assert_eq!(pool.backends().len(), 3);
    }

    #[test]
    fn test_set_health_reports_transitions() {
        let pool = BackendPool::new(urls());
        assert!(!pool.set_health("http://localhost:8001", true));
        assert!(pool.set_health("http://localhost:8001", false));
        assert!(!pool.set_health("http://localhost:8001", false));
        assert!(pool.set_health("http://localhost:8001", true));
    }

    #[test]
    fn test_unknown_url_ignored() {
        let pool = BackendPool::new(urls());
        assert!(!pool.set_health("http://elsewhere:1", false));
        assert_eq!(pool.snapshot_healthy().len(), 3);
    }

    #[test]
    fn test_empty_snapshot_when_all_down() {
        let pool = BackendPool::new(urls());
        for url in urls() {
            pool.set_health(&url, false);
        }
        assert!(pool.snapshot_healthy().is_empty());
    }

    #[test]
    fn test_concurrent_updates_never_corrupt_snapshot() {
        let pool = Arc::new(BackendPool::new(urls()));
        let configured: HashSet<String> = urls().into_iter().collect();

        let writers: Vec<_> = (0..4)
            .map(|t| {
                let pool = pool.clone();
                thread::spawn(move || {
                    for i in 0..1000 {
                        let url = format!("http://localhost:800{}", (i + t) % 3 + 1);
                        pool.set_health(&url, (i + t) % 2 == 0);
                    }
                })
            })
            .collect();

        let reader = {
            let pool = pool.clone();
            let configured = configured.clone();
            thread::spawn(move || {
                for _ in 0..1000 {
                    let snapshot = pool.snapshot_healthy();
                    let seen: HashSet<_> = snapshot.iter().map(|b| b.url.clone()).collect();
                    assert_eq!(seen.len(), snapshot.len(), "duplicate backend in snapshot");
                    assert!(seen.is_subset(&configured));
                    assert!(snapshot.iter().all(|b| b.healthy));
                }
            })
        };

        for w in writers {
            w.join().unwrap();
        }
        reader.join().unwrap();
        assert_eq!(pool.len(), 3);
    }

    #[test]
    fn test_duplicate_urls_all_updated() {
        let pool = BackendPool::new(["http://localhost:8001", "http://localhost:8001"]);
        assert!(pool.set_health("http://localhost:8001", false));
        assert!(pool.snapshot_healthy().is_empty());
    }

    #[test]
    fn test_set_health_at_addresses_one_entry() {
        let pool = BackendPool::new(["http://localhost:8001", "http://localhost:8001"]);
        assert!(pool.set_health_at(1, false));
        assert!(!pool.set_health_at(1, false));
        assert!(!pool.set_health_at(7, false));

        let backends = pool.backends();
        assert!(backends[0].healthy);
        assert!(!backends[1].healthy);
    }
}
