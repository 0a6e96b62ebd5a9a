//! In-memory caching for derived statistics.
//!
//! Two shapes of cache sit between the HTTP layer and storage:
//! - [`StatCache`]: one aggregate value per string key (server endpoint or
//!   player name), TTL-bounded, single-flight per key.
//! - [`ReportCache`]: one full ordered report shared by all requested
//!   prefix lengths, TTL-bounded, double-checked recompute.
//!
//! Both are process-local: empty on start, populated on demand, entries
//! aged out by TTL. Nothing survives a restart.

pub mod report_cache;
pub mod stat_cache;

pub use report_cache::ReportCache;
pub use stat_cache::StatCache;

/// Capability required of values placed in a [`StatCache`]: a stable
/// string key that determines cache placement.
pub trait CacheKeyed {
    fn cache_key(&self) -> &str;
}
