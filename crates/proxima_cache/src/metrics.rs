use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// What happened to one request on its way through the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheEvent {
    /// A stored record was looked up.
    Lookup,
    /// Probe answered 304; record served.
    Hit,
    /// Probe answered 200; the new response replaced the record.
    Refresh,
    /// Probe failed or answered something else; record deleted.
    Invalidate,
    /// No record for the key.
    Miss,
    Store,
    /// Cacheable, but the URL or body exceeds the persisted limits.
    SkippedOversize,
    /// Cache not consulted (method, client `Cache-Control`, no key).
    Bypass,
}

#[derive(Debug, Default)]
pub struct CacheMetrics {
    lookups: AtomicU64,
    hits: AtomicU64,
    refreshes: AtomicU64,
    invalidations: AtomicU64,
    misses: AtomicU64,
    stores: AtomicU64,
    skipped_oversize: AtomicU64,
    bypassed: AtomicU64,
}

/// Point-in-time copy of the counters, served as JSON by the admin endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub lookups: u64,
    pub hits: u64,
    pub refreshes: u64,
    pub invalidations: u64,
    pub misses: u64,
    pub stores: u64,
    pub skipped_oversize: u64,
    pub bypassed: u64,
}

impl CacheMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, event: CacheEvent) {
        let counter = match event {
            CacheEvent::Lookup => &self.lookups,
            CacheEvent::Hit => &self.hits,
            CacheEvent::Refresh => &self.refreshes,
            CacheEvent::Invalidate => &self.invalidations,
            CacheEvent::Miss => &self.misses,
            CacheEvent::Store => &self.stores,
            CacheEvent::SkippedOversize => &self.skipped_oversize,
            CacheEvent::Bypass => &self.bypassed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            lookups: self.lookups.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
            refreshes: self.refreshes.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            stores: self.stores.load(Ordering::Relaxed),
            skipped_oversize: self.skipped_oversize.load(Ordering::Relaxed),
            bypassed: self.bypassed.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_land_in_their_counter() {
        let metrics = CacheMetrics::new();
        metrics.record(CacheEvent::Lookup);
        metrics.record(CacheEvent::Lookup);
        metrics.record(CacheEvent::Hit);
        metrics.record(CacheEvent::SkippedOversize);

        let snap = metrics.snapshot();
        assert_eq!(snap.lookups, 2);
        assert_eq!(snap.hits, 1);
        assert_eq!(snap.skipped_oversize, 1);
        assert_eq!(snap.misses, 0);

        let json = serde_json::to_value(snap).unwrap();
        assert_eq!(json["lookups"], 2);
    }
}
