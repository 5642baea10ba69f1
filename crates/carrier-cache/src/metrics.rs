//! Cache metrics tracking and `metrics` facade emission (§4.8 side
//! channel for the result cache). Collapsed from the teacher's
//! multi-tier (`L1`/`L2`/`L3`) metrics down to the single tier the
//! result cache actually has — §4.5 caches only the search operation in
//! one in-process store, there is no L2/L3 here.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use metrics::{counter, gauge, histogram};

use crate::types::CacheStats;

/// Atomic counters backing `CacheStats`, safe to share across the cache's
/// concurrent readers and writers.
#[derive(Debug, Clone)]
pub struct CacheMetrics {
    hits: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
    writes: Arc<AtomicU64>,
    invalidations: Arc<AtomicU64>,
}

impl CacheMetrics {
    pub fn new() -> Self {
        Self {
            hits: Arc::new(AtomicU64::new(0)),
            misses: Arc::new(AtomicU64::new(0)),
            writes: Arc::new(AtomicU64::new(0)),
            invalidations: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
        counter!("carrier_dispatch_cache_hits_total").increment(1);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
        counter!("carrier_dispatch_cache_misses_total").increment(1);
    }

    pub fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::Relaxed);
        counter!("carrier_dispatch_cache_writes_total").increment(1);
    }

    pub fn record_invalidation(&self, count: u64) {
        self.invalidations.fetch_add(count, Ordering::Relaxed);
        counter!("carrier_dispatch_cache_invalidations_total").increment(count);
    }

    pub fn record_latency(&self, duration: Duration) {
        histogram!("carrier_dispatch_cache_latency_ms").record(duration.as_secs_f64() * 1000.0);
    }

    pub fn update_size(&self, entries: u64) {
        gauge!("carrier_dispatch_cache_entries").set(entries as f64);
    }

    pub fn snapshot(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
        }
    }
}

impl Default for CacheMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// RAII latency sample; records into `CacheMetrics` on drop.
pub struct LatencyTimer {
    start: Instant,
    metrics: CacheMetrics,
}

impl LatencyTimer {
    pub fn new(metrics: CacheMetrics) -> Self {
        Self {
            start: Instant::now(),
            metrics,
        }
    }
}

impl Drop for LatencyTimer {
    fn drop(&mut self) {
        self.metrics.record_latency(self.start.elapsed());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_recorded_operations() {
        let metrics = CacheMetrics::new();
        metrics.record_hit();
        metrics.record_hit();
        metrics.record_miss();
        metrics.record_write();

        let snap = metrics.snapshot();
        assert_eq!(snap.hits, 2);
        assert_eq!(snap.misses, 1);
        assert_eq!(snap.writes, 1);
        assert!((snap.hit_rate() - (2.0 / 3.0)).abs() < 1e-9);
    }

    #[test]
    fn empty_metrics_have_zero_hit_rate() {
        assert_eq!(CacheMetrics::new().snapshot().hit_rate(), 0.0);
    }
}
