//! Key-value stat cache with TTL expiry and single-flight recomputation.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

use super::CacheKeyed;

/// Cached value plus the instant it was populated.
struct Slot<T> {
    value: Option<(T, Instant)>,
}

impl<T> Slot<T> {
    fn empty() -> Self {
        Self { value: None }
    }

    fn fresh(&self, ttl: Duration) -> Option<&T> {
        match &self.value {
            Some((value, stored_at)) if stored_at.elapsed() < ttl => Some(value),
            _ => None,
        }
    }
}

/// Memoizes one aggregate value per string key.
///
/// Entries expire a fixed TTL after they were populated. On a miss,
/// exactly one computation runs per key; concurrent callers for the same
/// key wait on the per-key lock and then read the freshly stored value
/// instead of triggering their own storage work. A failed computation is
/// not cached, so the next caller retries it.
///
/// There is no capacity eviction: the key space is bounded by the servers
/// and players actually queried, and each entry is small.
pub struct StatCache<T> {
    ttl: Duration,
    slots: Mutex<HashMap<String, Arc<Mutex<Slot<T>>>>>,
}

impl<T: Clone + CacheKeyed> StatCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Return the cached value for `key`, or run `compute` to fill it.
    ///
    /// The slot lock is held across `compute`, which is what makes this
    /// single-flight: the map lock itself is only held to look up or
    /// insert the slot handle.
    pub async fn get_or_compute<F, Fut, E>(&self, key: &str, compute: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let slot = {
            let mut slots = self.slots.lock().await;
            Arc::clone(
                slots
                    .entry(key.to_string())
                    .or_insert_with(|| Arc::new(Mutex::new(Slot::empty()))),
            )
        };

        let mut slot = slot.lock().await;
        if let Some(value) = slot.fresh(self.ttl) {
            return Ok(value.clone());
        }

        let value = compute().await?;
        debug_assert_eq!(value.cache_key(), key);
        slot.value = Some((value.clone(), Instant::now()));
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone, PartialEq)]
    struct Snapshot {
        key: String,
        value: u64,
    }

    impl CacheKeyed for Snapshot {
        fn cache_key(&self) -> &str {
            &self.key
        }
    }

    fn snapshot(key: &str, value: u64) -> Snapshot {
        Snapshot {
            key: key.to_string(),
            value,
        }
    }

    #[tokio::test]
    async fn test_hit_within_ttl_skips_recompute() {
        let cache = StatCache::new(Duration::from_secs(60));
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let got: Result<Snapshot, ()> = cache
                .get_or_compute("k", || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(snapshot("k", 1))
                })
                .await;
            assert_eq!(got.unwrap().value, 1);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_ttl_bounded_staleness() {
        // Underlying data "changes" between calls; within the TTL the
        // cache must keep serving the first result.
        let cache = StatCache::new(Duration::from_secs(60));
        let source = AtomicUsize::new(10);

        let first: Result<Snapshot, ()> = cache
            .get_or_compute("k", || async {
                Ok(snapshot("k", source.load(Ordering::SeqCst) as u64))
            })
            .await;
        source.store(99, Ordering::SeqCst);
        let second: Result<Snapshot, ()> = cache
            .get_or_compute("k", || async {
                Ok(snapshot("k", source.load(Ordering::SeqCst) as u64))
            })
            .await;

        assert_eq!(first.unwrap(), second.unwrap());
    }

    #[tokio::test]
    async fn test_expired_entry_recomputes() {
        let cache = StatCache::new(Duration::from_millis(20));

        let first: Result<Snapshot, ()> = cache.get_or_compute("k", || async { Ok(snapshot("k", 1)) }).await;
        assert_eq!(first.unwrap().value, 1);

        tokio::time::sleep(Duration::from_millis(40)).await;

        let second: Result<Snapshot, ()> = cache.get_or_compute("k", || async { Ok(snapshot("k", 2)) }).await;
        assert_eq!(second.unwrap().value, 2);
    }

    #[tokio::test]
    async fn test_failure_is_not_cached() {
        let cache = StatCache::new(Duration::from_secs(60));
        let calls = AtomicUsize::new(0);

        let failed: Result<Snapshot, &str> = cache
            .get_or_compute("k", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err("storage down")
            })
            .await;
        assert!(failed.is_err());

        let ok: Result<Snapshot, &str> = cache
            .get_or_compute("k", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(snapshot("k", 7))
            })
            .await;
        assert_eq!(ok.unwrap().value, 7);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_single_flight_under_concurrency() {
        let cache = Arc::new(StatCache::new(Duration::from_secs(60)));
        let calls = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(tokio::sync::Barrier::new(8));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = Arc::clone(&cache);
            let calls = Arc::clone(&calls);
            let barrier = Arc::clone(&barrier);
            handles.push(tokio::spawn(async move {
                barrier.wait().await;
                let got: Result<Snapshot, ()> = cache
                    .get_or_compute("k", || async {
                        calls.fetch_add(1, Ordering::SeqCst);
                        // Hold the computation open long enough for the
                        // other callers to queue up on the slot lock.
                        tokio::time::sleep(Duration::from_millis(30)).await;
                        Ok(snapshot("k", 42))
                    })
                    .await;
                got.unwrap().value
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap(), 42);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_distinct_keys_compute_independently() {
        let cache = StatCache::new(Duration::from_secs(60));
        let calls = AtomicUsize::new(0);

        for key in ["a", "b", "a"] {
            let _: Result<Snapshot, ()> = cache
                .get_or_compute(key, || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(snapshot(key, 0))
                })
                .await;
        }

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
