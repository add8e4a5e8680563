//! Process-local cache tier using moka.
//!
//! Tier 1 holds a handful of recently used (POI, band) results in memory.
//! It is deliberately tiny: the distributed tier is the real cache, this one
//! only absorbs bursts for the hottest keys.
//!
//! Moka provides:
//! - Lock-free reads (common case)
//! - Bounded size with automatic LRU-style eviction
//! - Per-entry time-to-live

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;

use crate::coord::DistanceBand;
use crate::model::{PoiId, StoreDistance};

/// Default number of entries held in Tier 1.
pub const DEFAULT_LOCAL_CAPACITY: u64 = 10;

/// Default Tier 1 time-to-live.
pub const DEFAULT_LOCAL_TTL: Duration = Duration::from_secs(60 * 60);

/// Key of one cached result list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub poi_id: PoiId,
    pub band: DistanceBand,
}

impl CacheKey {
    pub fn new(poi_id: PoiId, band: DistanceBand) -> Self {
        Self { poi_id, band }
    }
}

/// Tier 1 counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LocalTierStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub entry_count: u64,
}

impl LocalTierStats {
    /// Hit rate as a percentage (0 when there has been no traffic).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64 * 100.0
        }
    }
}

/// Bounded in-memory cache of nearby-store results.
pub struct LocalTier {
    cache: Cache<CacheKey, Arc<Vec<StoreDistance>>>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: Arc<AtomicU64>,
}

impl LocalTier {
    /// Create a tier with the given capacity (entries) and TTL.
    pub fn new(capacity: u64, ttl: Duration) -> Self {
        let evictions = Arc::new(AtomicU64::new(0));
        let listener_evictions = Arc::clone(&evictions);

        let cache = Cache::builder()
            .max_capacity(capacity)
            .time_to_live(ttl)
            .eviction_listener(move |_key, _value, cause| {
                if cause.was_evicted() {
                    listener_evictions.fetch_add(1, Ordering::Relaxed);
                }
            })
            .build();

        Self {
            cache,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions,
        }
    }

    /// Get a cached result list.
    pub async fn get(&self, key: &CacheKey) -> Option<Arc<Vec<StoreDistance>>> {
        match self.cache.get(key).await {
            Some(rows) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(rows)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Insert or replace a result list.
    pub async fn put(&self, key: CacheKey, rows: Arc<Vec<StoreDistance>>) {
        self.cache.insert(key, rows).await;
    }

    /// Remove one key.
    pub async fn invalidate(&self, key: &CacheKey) {
        self.cache.invalidate(key).await;
    }

    /// Remove every band entry for a POI.
    pub async fn evict_poi(&self, poi_id: PoiId) {
        for band in DistanceBand::ALL {
            self.cache.invalidate(&CacheKey::new(poi_id, band)).await;
        }
    }

    /// Check presence without touching hit/miss counters.
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.cache.contains_key(key)
    }

    /// Flush pending maintenance so counts and evictions are current.
    pub async fn sync(&self) {
        self.cache.run_pending_tasks().await;
    }

    /// Get tier statistics.
    pub fn stats(&self) -> LocalTierStats {
        LocalTierStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            entry_count: self.cache.entry_count(),
        }
    }
}

impl Default for LocalTier {
    fn default() -> Self {
        Self::new(DEFAULT_LOCAL_CAPACITY, DEFAULT_LOCAL_TTL)
    }
}
