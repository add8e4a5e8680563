//! Two-tier cache orchestration.
//!
//! ```text
//! get(poi, band)
//!   │
//!   ├─► Tier 1 (moka, in-process) ── hit ──────────────────► Hit { Local }
//!   │        │ miss
//!   │        ▼
//!   └─► Tier 2 (sorted set) ── hit ─► promote to Tier 1 ──► Hit { Distributed }
//!            │ miss / error
//!            ▼
//!          Miss
//! ```
//!
//! Tier 2 failures are logged and read as a miss, so a broken distributed
//! store only costs latency.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::cache::distributed::DistributedTier;
use crate::cache::local::{CacheKey, LocalTier, LocalTierStats};
use crate::cache::traits::{DistributedStore, StoreError};
use crate::coord::DistanceBand;
use crate::model::{PoiId, StoreDistance};
use crate::threshold::ThresholdReader;

/// Which tier served a hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheTier {
    Local,
    Distributed,
}

/// Outcome of a cache lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup {
    Hit {
        rows: Arc<Vec<StoreDistance>>,
        tier: CacheTier,
    },
    Miss,
}

impl CacheLookup {
    pub fn is_hit(&self) -> bool {
        matches!(self, CacheLookup::Hit { .. })
    }
}

/// Tier 1 in front of Tier 2.
pub struct MultiTierCache {
    local: LocalTier,
    distributed: DistributedTier,
}

impl MultiTierCache {
    /// Create an orchestrator over the given tiers.
    pub fn new(local: LocalTier, distributed: DistributedTier) -> Self {
        Self { local, distributed }
    }

    /// Create an orchestrator with a default Tier 1 over `store`.
    pub fn with_store(
        store: Arc<dyn DistributedStore>,
        thresholds: Arc<dyn ThresholdReader>,
    ) -> Self {
        Self::new(
            LocalTier::default(),
            DistributedTier::new(store, thresholds),
        )
    }

    /// Look up a result list.
    pub async fn get(&self, poi_id: PoiId, band: DistanceBand) -> CacheLookup {
        let key = CacheKey::new(poi_id, band);
        if let Some(rows) = self.local.get(&key).await {
            debug!(poi_id = %poi_id, band = %band, "Local cache hit");
            return CacheLookup::Hit {
                rows,
                tier: CacheTier::Local,
            };
        }

        match self.distributed.get(poi_id, band).await {
            Ok(Some(rows)) => {
                let rows = Arc::new(rows);
                self.local.put(key, Arc::clone(&rows)).await;
                debug!(poi_id = %poi_id, band = %band, "Distributed cache hit, promoted to local");
                CacheLookup::Hit {
                    rows,
                    tier: CacheTier::Distributed,
                }
            }
            Ok(None) => {
                debug!(poi_id = %poi_id, band = %band, "Cache miss");
                CacheLookup::Miss
            }
            Err(e) => {
                warn!(poi_id = %poi_id, band = %band, error = %e, "Distributed cache read failed");
                CacheLookup::Miss
            }
        }
    }

    /// Write a result list through both tiers.
    ///
    /// An empty list clears the key in both tiers instead.
    pub async fn put(
        &self,
        poi_id: PoiId,
        band: DistanceBand,
        rows: Vec<StoreDistance>,
    ) -> Result<(), StoreError> {
        let key = CacheKey::new(poi_id, band);
        if rows.is_empty() {
            self.local.invalidate(&key).await;
        } else {
            self.local.put(key, Arc::new(rows.clone())).await;
        }
        self.distributed.put(poi_id, band, &rows).await
    }

    /// Remove every band of a POI from both tiers.
    pub async fn evict(&self, poi_id: PoiId) -> Result<u64, StoreError> {
        self.local.evict_poi(poi_id).await;
        let removed = self.distributed.evict_poi(poi_id).await?;
        debug!(poi_id = %poi_id, removed, "Evicted POI from all cache tiers");
        Ok(removed)
    }

    /// True if either tier holds an entry for the key.
    pub async fn has_live_entry(
        &self,
        poi_id: PoiId,
        band: DistanceBand,
    ) -> Result<bool, StoreError> {
        if self.local.contains(&CacheKey::new(poi_id, band)) {
            return Ok(true);
        }
        self.distributed.contains(poi_id, band).await
    }

    /// Tier 1 statistics.
    pub fn local_stats(&self) -> LocalTierStats {
        self.local.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryStore;
    use crate::clock::ManualClock;
    use crate::model::StoreId;
    use crate::threshold::ThresholdState;

    fn cache() -> (MultiTierCache, Arc<MemoryStore>) {
        let clock = ManualClock::starting_now();
        let store = Arc::new(MemoryStore::new(clock));
        let cache = MultiTierCache::with_store(store.clone(), Arc::new(ThresholdState::default()));
        (cache, store)
    }

    fn rows() -> Vec<StoreDistance> {
        vec![
            StoreDistance::new(StoreId(3), 120),
            StoreDistance::new(StoreId(1), 450),
        ]
    }

    #[tokio::test]
    async fn test_round_trip_through_local_tier() {
        let (cache, _) = cache();
        cache.put(PoiId(1), DistanceBand::M500, rows()).await.unwrap();

        match cache.get(PoiId(1), DistanceBand::M500).await {
            CacheLookup::Hit { rows: cached, tier } => {
                assert_eq!(tier, CacheTier::Local);
                assert_eq!(*cached, rows());
            }
            CacheLookup::Miss => panic!("expected hit"),
        }
    }

    #[tokio::test]
    async fn test_distributed_hit_promotes_to_local() {
        let (cache, store) = cache();
        let tier2 = DistributedTier::new(store.clone(), Arc::new(ThresholdState::default()));
        tier2.put(PoiId(2), DistanceBand::M300, &rows()).await.unwrap();

        let first = cache.get(PoiId(2), DistanceBand::M300).await;
        assert!(matches!(
            first,
            CacheLookup::Hit {
                tier: CacheTier::Distributed,
                ..
            }
        ));

        let second = cache.get(PoiId(2), DistanceBand::M300).await;
        assert!(matches!(
            second,
            CacheLookup::Hit {
                tier: CacheTier::Local,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_double_miss() {
        let (cache, _) = cache();
        assert_eq!(cache.get(PoiId(9), DistanceBand::M700).await, CacheLookup::Miss);
        assert_eq!(cache.local_stats().misses, 1);
    }

    #[tokio::test]
    async fn test_distributed_failure_reads_as_miss() {
        let (cache, store) = cache();
        store.set_unavailable(true);
        assert_eq!(cache.get(PoiId(1), DistanceBand::M500).await, CacheLookup::Miss);
    }

    #[tokio::test]
    async fn test_empty_put_clears_both_tiers() {
        let (cache, _) = cache();
        cache.put(PoiId(1), DistanceBand::M500, rows()).await.unwrap();
        cache.put(PoiId(1), DistanceBand::M500, Vec::new()).await.unwrap();

        assert!(!cache.has_live_entry(PoiId(1), DistanceBand::M500).await.unwrap());
        assert_eq!(cache.get(PoiId(1), DistanceBand::M500).await, CacheLookup::Miss);
    }

    #[tokio::test]
    async fn test_evict_clears_every_band() {
        let (cache, _) = cache();
        cache.put(PoiId(1), DistanceBand::M300, rows()).await.unwrap();
        cache.put(PoiId(1), DistanceBand::M1000, rows()).await.unwrap();

        assert_eq!(cache.evict(PoiId(1)).await.unwrap(), 2);
        for band in DistanceBand::ALL {
            assert!(!cache.has_live_entry(PoiId(1), band).await.unwrap());
        }
    }
}
