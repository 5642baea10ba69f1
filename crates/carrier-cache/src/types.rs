use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A cached response, keyed by a deterministic fingerprint of the
/// normalized search request (§4.5). Created on first successful response;
/// destroyed on TTL expiry or explicit tag-based invalidation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry<V> {
    pub key: String,
    pub value: V,
    pub tags: Vec<String>,
    pub expires_at: DateTime<Utc>,
}

impl<V> CacheEntry<V> {
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

/// Aggregate counters for cache operations, read-only snapshot for callers.
#[derive(Debug, Default, Clone, Copy)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub writes: u64,
    pub invalidations: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
