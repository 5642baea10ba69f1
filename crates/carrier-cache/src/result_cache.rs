//! The Result Cache (§4.5): caches only `searchNumbers` responses, the
//! one idempotent operation in the adapter contract. Built on
//! `moka::future::Cache` for capacity/TTL mechanics, with a side
//! `DashMap` tag index for `invalidate_by_tag` since moka has no native
//! tag support.

use std::sync::Arc;
use std::time::{Duration, Instant};

use carrier_providers::NumberSearchResponse;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use moka::future::Cache;
use moka::Expiry;
use tracing::debug;

use crate::metrics::{CacheMetrics, LatencyTimer};
use crate::types::{CacheEntry, CacheStats};

/// Default TTL (§4.5): 300 seconds, overridable per call via
/// [`ResultCache::put_with_ttl`].
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Upper bound on the number of distinct search keys retained at once.
const MAX_CAPACITY: u64 = 10_000;

struct PerEntryExpiry;

impl Expiry<String, Arc<CacheEntry<NumberSearchResponse>>> for PerEntryExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &Arc<CacheEntry<NumberSearchResponse>>,
        _created_at: Instant,
    ) -> Option<Duration> {
        let remaining = value.expires_at - Utc::now();
        Some(remaining.to_std().unwrap_or(Duration::ZERO))
    }
}

/// In-process cache for search results, keyed by [`crate::key::cache_key`].
#[derive(Clone)]
pub struct ResultCache {
    cache: Cache<String, Arc<CacheEntry<NumberSearchResponse>>>,
    tags: Arc<DashMap<String, Vec<String>>>,
    metrics: CacheMetrics,
}

impl ResultCache {
    pub fn new(metrics: CacheMetrics) -> Self {
        let cache = Cache::builder()
            .max_capacity(MAX_CAPACITY)
            .expire_after(PerEntryExpiry)
            .build();

        Self {
            cache,
            tags: Arc::new(DashMap::new()),
            metrics,
        }
    }

    /// Looks up `key`. A hit sets `cached = true` on the returned
    /// response while preserving the original `search_id` (§4.5).
    pub async fn get(&self, key: &str) -> Option<NumberSearchResponse> {
        let _timer = LatencyTimer::new(self.metrics.clone());

        let entry = self.cache.get(key).await;
        match entry {
            Some(entry) if !entry.is_expired() => {
                debug!(key, "result cache hit");
                self.metrics.record_hit();
                let mut response = entry.value.clone();
                response.cached = true;
                Some(response)
            }
            Some(_) => {
                debug!(key, "result cache entry expired on read");
                self.metrics.record_miss();
                None
            }
            None => {
                debug!(key, "result cache miss");
                self.metrics.record_miss();
                None
            }
        }
    }

    /// Stores `value` under `key` with the default TTL and no tags.
    pub async fn put(&self, key: String, value: NumberSearchResponse) {
        self.put_with(key, value, DEFAULT_TTL, Vec::new()).await;
    }

    /// Stores `value` under `key` with an explicit TTL override.
    pub async fn put_with_ttl(&self, key: String, value: NumberSearchResponse, ttl: Duration) {
        self.put_with(key, value, ttl, Vec::new()).await;
    }

    /// Stores `value` under `key` with an explicit TTL and tag set;
    /// tags enable later bulk removal via [`Self::invalidate_by_tag`].
    pub async fn put_with(
        &self,
        key: String,
        value: NumberSearchResponse,
        ttl: Duration,
        tags: Vec<String>,
    ) {
        let expires_at: DateTime<Utc> = Utc::now()
            + chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::zero());

        let entry = Arc::new(CacheEntry {
            key: key.clone(),
            value,
            tags: tags.clone(),
            expires_at,
        });

        for tag in &tags {
            self.tags.entry(tag.clone()).or_default().push(key.clone());
        }

        self.cache.insert(key, entry).await;
        self.metrics.record_write();
        self.metrics.update_size(self.cache.entry_count());
    }

    /// Removes every entry tagged with `tag`. Returns the number of
    /// entries removed.
    pub async fn invalidate_by_tag(&self, tag: &str) -> usize {
        let Some((_, keys)) = self.tags.remove(tag) else {
            return 0;
        };

        for key in &keys {
            self.cache.invalidate(key).await;
        }
        self.metrics.record_invalidation(keys.len() as u64);
        self.metrics.update_size(self.cache.entry_count());
        keys.len()
    }

    pub async fn remove(&self, key: &str) {
        self.cache.invalidate(key).await;
    }

    pub fn stats(&self) -> CacheStats {
        self.metrics.snapshot()
    }

    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carrier_providers::ProviderId;

    fn response(search_id: &str) -> NumberSearchResponse {
        NumberSearchResponse {
            numbers: Vec::new(),
            total_count: 0,
            search_id: search_id.to_string(),
            provider: ProviderId::from("twilio"),
            response_time_ms: 12,
            cached: false,
        }
    }

    #[tokio::test]
    async fn miss_then_hit_preserves_search_id_and_sets_cached() {
        let cache = ResultCache::new(CacheMetrics::new());

        assert!(cache.get("k1").await.is_none());

        cache.put("k1".to_string(), response("search-abc")).await;

        let hit = cache.get("k1").await.unwrap();
        assert!(hit.cached);
        assert_eq!(hit.search_id, "search-abc");
    }

    #[tokio::test]
    async fn invalidate_by_tag_removes_only_tagged_entries() {
        let cache = ResultCache::new(CacheMetrics::new());

        cache
            .put_with(
                "k1".to_string(),
                response("a"),
                DEFAULT_TTL,
                vec!["region:us".to_string()],
            )
            .await;
        cache
            .put_with(
                "k2".to_string(),
                response("b"),
                DEFAULT_TTL,
                vec!["region:in".to_string()],
            )
            .await;

        let removed = cache.invalidate_by_tag("region:us").await;
        assert_eq!(removed, 1);

        assert!(cache.get("k1").await.is_none());
        assert!(cache.get("k2").await.is_some());
    }

    #[tokio::test]
    async fn per_call_ttl_override_expires_entry_quickly() {
        let cache = ResultCache::new(CacheMetrics::new());

        cache
            .put_with_ttl("k1".to_string(), response("a"), Duration::from_millis(10))
            .await;

        tokio::time::sleep(Duration::from_millis(60)).await;
        cache.cache.run_pending_tasks().await;

        assert!(cache.get("k1").await.is_none());
    }
}
