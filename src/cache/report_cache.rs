//! Prefix-list report cache.

use std::future::Future;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

/// The one report a [`ReportCache`] holds, plus its refresh instant.
struct CachedReport<T> {
    items: Vec<T>,
    refreshed_at: Instant,
}

impl<T: Clone> CachedReport<T> {
    fn fresh(&self, ttl: Duration) -> bool {
        self.refreshed_at.elapsed() < ttl
    }

    fn prefix(&self, count: usize) -> Vec<T> {
        self.items.iter().take(count).cloned().collect()
    }
}

/// Memoizes one ordered list report shared across all prefix lengths.
///
/// The full report is computed once (bounded to `max_items`) and callers
/// receive its first `count` items. The read path takes a shared lock; on
/// miss or expiry the caller upgrades to the write lock and re-checks
/// before recomputing, so concurrent racers collapse into one refresh.
///
/// A request for more items than the cached report holds returns the
/// whole cached list; the report is never recomputed with a larger bound
/// just to satisfy a larger request.
pub struct ReportCache<T> {
    ttl: Duration,
    max_items: usize,
    inner: RwLock<Option<CachedReport<T>>>,
}

impl<T: Clone> ReportCache<T> {
    pub fn new(ttl: Duration, max_items: usize) -> Self {
        Self {
            ttl,
            max_items,
            inner: RwLock::new(None),
        }
    }

    /// Upper bound on the number of items one report may hold.
    pub fn max_items(&self) -> usize {
        self.max_items
    }

    /// Return the first `count` items of the report, refreshing it via
    /// `compute_full` if missing or expired.
    pub async fn get_or_compute<F, Fut, E>(&self, count: usize, compute_full: F) -> Result<Vec<T>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<T>, E>>,
    {
        {
            let guard = self.inner.read().await;
            if let Some(report) = guard.as_ref() {
                if report.fresh(self.ttl) {
                    return Ok(report.prefix(count));
                }
            }
        }

        let mut guard = self.inner.write().await;
        // Another writer may have refreshed while we waited.
        if let Some(report) = guard.as_ref() {
            if report.fresh(self.ttl) {
                return Ok(report.prefix(count));
            }
        }

        let mut items = compute_full().await?;
        items.truncate(self.max_items);
        let report = CachedReport {
            items,
            refreshed_at: Instant::now(),
        };
        let result = report.prefix(count);
        *guard = Some(report);
        Ok(result)
    }
}
