//! Store-write invalidation.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::policy::{InvalidationAction, InvalidationPolicy};
use crate::cache::{MultiTierCache, StalenessTracker, REASON_NEW_STORE};
use crate::coord::{DistanceBand, GeoPoint};
use crate::error::GeoError;
use crate::model::{PoiId, StoreId};
use crate::resolver::SpatialResolver;

/// A store write that may affect nearby cached results.
#[derive(Debug, Clone, PartialEq)]
pub struct InvalidationTask {
    pub store_id: StoreId,
    pub location: GeoPoint,
}

/// What one invalidation pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvalidationOutcome {
    /// POIs whose live entries were marked stale.
    pub stale_marked: Vec<PoiId>,
    /// POIs evicted from both tiers.
    pub evicted: Vec<PoiId>,
}

impl InvalidationOutcome {
    pub fn total(&self) -> usize {
        self.stale_marked.len() + self.evicted.len()
    }
}

/// Applies an [`InvalidationPolicy`] to every POI near a written store.
pub struct InvalidationHandler {
    resolver: SpatialResolver,
    cache: Arc<MultiTierCache>,
    staleness: Arc<StalenessTracker>,
    policy: Arc<dyn InvalidationPolicy>,
}

impl InvalidationHandler {
    pub fn new(
        resolver: SpatialResolver,
        cache: Arc<MultiTierCache>,
        staleness: Arc<StalenessTracker>,
        policy: Arc<dyn InvalidationPolicy>,
    ) -> Self {
        Self {
            resolver,
            cache,
            staleness,
            policy,
        }
    }

    /// Invalidate cached results around a store.
    ///
    /// Only finding the affected POIs can fail; per-POI cache errors are
    /// logged and the pass continues.
    pub async fn handle(&self, task: &InvalidationTask) -> Result<InvalidationOutcome, GeoError> {
        info!(
            store_id = %task.store_id,
            location = %task.location,
            policy = self.policy.name(),
            "Processing cache invalidation for store"
        );

        let affected = self.resolver.affected_pois(task.location).await?;
        let mut outcome = InvalidationOutcome::default();

        for poi_id in affected {
            match self.policy.decide(poi_id).await {
                InvalidationAction::MarkStale => {
                    self.mark_live_bands_stale(poi_id).await;
                    outcome.stale_marked.push(poi_id);
                    debug!(poi_id = %poi_id, "Marked hotspot POI stale");
                }
                InvalidationAction::Evict => {
                    if let Err(e) = self.cache.evict(poi_id).await {
                        warn!(poi_id = %poi_id, error = %e, "Cache eviction failed");
                    }
                    outcome.evicted.push(poi_id);
                    debug!(poi_id = %poi_id, "Evicted POI cache");
                }
            }
        }

        info!(
            store_id = %task.store_id,
            evicted = outcome.evicted.len(),
            stale_marked = outcome.stale_marked.len(),
            total = outcome.total(),
            "Cache invalidation completed"
        );
        Ok(outcome)
    }

    async fn mark_live_bands_stale(&self, poi_id: PoiId) {
        for band in DistanceBand::ALL {
            match self.cache.has_live_entry(poi_id, band).await {
                Ok(true) => {
                    if let Err(e) = self
                        .staleness
                        .mark_stale(poi_id, band, REASON_NEW_STORE)
                        .await
                    {
                        warn!(
                            poi_id = %poi_id,
                            band = %band,
                            error = %e,
                            "Failed to mark cache stale"
                        );
                    }
                }
                Ok(false) => {}
                Err(e) => {
                    warn!(
                        poi_id = %poi_id,
                        band = %band,
                        error = %e,
                        "Cache presence check failed"
                    );
                }
            }
        }
    }
}
