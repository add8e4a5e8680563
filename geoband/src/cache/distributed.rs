//! Distributed cache tier.
//!
//! Each (POI, band) result list is a sorted set keyed
//! `poi:{id}:stores:{band}m`, with the store id as member and the distance in
//! meters as score. Writes replace the whole set and then apply the current
//! TTL from [`ThresholdReader`].
//!
//! # Consistency
//!
//! A write is a delete followed by one `zadd` per row. It is not
//! transactional: a concurrent reader can observe a partially written set.
//! Readers always re-sort by (distance, store id) so a complete set reads
//! back in exactly the order the resolver produced it.

use std::sync::Arc;

use tracing::debug;

use crate::cache::traits::{DistributedStore, StoreError};
use crate::coord::DistanceBand;
use crate::model::{sort_by_distance, PoiId, StoreDistance, StoreId};
use crate::threshold::ThresholdReader;

/// Key of the sorted set holding a (POI, band) result list.
pub fn result_key(poi_id: PoiId, band: DistanceBand) -> String {
    format!("poi:{}:stores:{}m", poi_id, band.meters())
}

/// Sorted-set backed result cache.
pub struct DistributedTier {
    store: Arc<dyn DistributedStore>,
    thresholds: Arc<dyn ThresholdReader>,
}

impl DistributedTier {
    pub fn new(store: Arc<dyn DistributedStore>, thresholds: Arc<dyn ThresholdReader>) -> Self {
        Self { store, thresholds }
    }

    /// Read a result list. An absent or empty set reads as `None`.
    pub async fn get(
        &self,
        poi_id: PoiId,
        band: DistanceBand,
    ) -> Result<Option<Vec<StoreDistance>>, StoreError> {
        let key = result_key(poi_id, band);
        let members = self.store.zrange_with_scores(&key).await?;
        if members.is_empty() {
            return Ok(None);
        }

        let mut rows = Vec::with_capacity(members.len());
        for (member, score) in members {
            let id = member.parse::<u64>().map_err(|e| StoreError::Decode {
                key: key.clone(),
                reason: format!("member {:?}: {}", member, e),
            })?;
            rows.push(StoreDistance::new(StoreId(id), score.round() as u32));
        }
        sort_by_distance(&mut rows);
        Ok(Some(rows))
    }

    /// Replace the result list and reset its TTL.
    ///
    /// An empty list only deletes the key.
    pub async fn put(
        &self,
        poi_id: PoiId,
        band: DistanceBand,
        rows: &[StoreDistance],
    ) -> Result<(), StoreError> {
        let key = result_key(poi_id, band);
        self.store.delete(vec![key.clone()]).await?;
        if rows.is_empty() {
            return Ok(());
        }

        for row in rows {
            self.store
                .zadd(&key, &row.store_id.to_string(), f64::from(row.distance_m))
                .await?;
        }
        let ttl = self.thresholds.cache_ttl();
        self.store.expire(&key, ttl).await?;

        debug!(
            key = %key,
            rows = rows.len(),
            ttl_secs = ttl.as_secs(),
            "Wrote distributed cache entry"
        );
        Ok(())
    }

    /// Check whether a non-empty entry exists.
    pub async fn contains(&self, poi_id: PoiId, band: DistanceBand) -> Result<bool, StoreError> {
        Ok(self.store.zcard(&result_key(poi_id, band)).await? > 0)
    }

    /// Delete every band entry for a POI, returning how many existed.
    pub async fn evict_poi(&self, poi_id: PoiId) -> Result<u64, StoreError> {
        let keys = DistanceBand::ALL
            .iter()
            .map(|band| result_key(poi_id, *band))
            .collect();
        self.store.delete(keys).await
    }
}
