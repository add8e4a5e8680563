//! Consumer-facing search service.
//!
//! `SpatialSearchService` ties the resolvers to the cache, staleness
//! tracker, access tracker and invalidation channel.
//!
//! # Nearby-store flow
//!
//! ```text
//! get_nearby_stores(poi, meters)
//!   │ validate band
//!   │ record access
//!   ▼
//! cache lookup ── miss ─────────────────────────────────► recompute
//!   │ hit
//!   ▼
//! metadata ── fresh ────────────────────────────────────► serve cached
//!   │ stale
//!   ├── hotspot and not too stale ─► serve cached, refresh in background
//!   └── otherwise ─────────────────────────────────────► recompute
//!
//! recompute = resolver ► cache put ► metadata FRESH
//! ```
//!
//! Cache and metadata failures are logged and only cost a recompute.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashSet;
use tracing::{debug, info, warn};

use crate::cache::{CacheKey, CacheLookup, CacheMetrics, MultiTierCache, StalenessTracker};
use crate::coord::{DistanceBand, GeoPoint};
use crate::error::GeoError;
use crate::hotspot::AccessTracker;
use crate::invalidation::InvalidationHandle;
use crate::model::{Poi, PoiId, Store, StoreDistance, StoreInfo};
use crate::resolver::SpatialResolver;

/// Search facade. Cheap to clone; all state is shared.
#[derive(Clone)]
pub struct SpatialSearchService {
    resolver: SpatialResolver,
    cache: Arc<MultiTierCache>,
    staleness: Arc<StalenessTracker>,
    tracker: Arc<AccessTracker>,
    metrics: Arc<CacheMetrics>,
    invalidation: Option<InvalidationHandle>,
    refreshing: Arc<DashSet<CacheKey>>,
}

impl SpatialSearchService {
    /// Create a service without an invalidation channel.
    pub fn new(
        resolver: SpatialResolver,
        cache: Arc<MultiTierCache>,
        staleness: Arc<StalenessTracker>,
        tracker: Arc<AccessTracker>,
        metrics: Arc<CacheMetrics>,
    ) -> Self {
        Self {
            resolver,
            cache,
            staleness,
            tracker,
            metrics,
            invalidation: None,
            refreshing: Arc::new(DashSet::new()),
        }
    }

    /// Attach the invalidation channel used by [`on_store_written`](Self::on_store_written).
    pub fn with_invalidation(mut self, handle: InvalidationHandle) -> Self {
        self.invalidation = Some(handle);
        self
    }

    /// Find the POI nearest a coordinate.
    ///
    /// # Errors
    ///
    /// - `InvalidCoordinate` for out-of-range or non-finite input
    /// - `NoPoiNearby` when nothing lies within 2000 m
    pub async fn find_nearest_poi(&self, lat: f64, lon: f64) -> Result<Poi, GeoError> {
        let point = GeoPoint::try_new(lat, lon)?;
        self.resolver.find_nearest_poi(point).await
    }

    /// Stores within `meters` of a POI, ascending by distance.
    ///
    /// # Arguments
    ///
    /// * `poi_id` - The POI to search around
    /// * `meters` - Search radius; must be one of the supported bands
    ///
    /// # Errors
    ///
    /// - `InvalidBand` if `meters` is not a supported band
    /// - `PoiNotFound` if the POI is unknown
    pub async fn get_nearby_stores(
        &self,
        poi_id: PoiId,
        meters: u32,
    ) -> Result<Vec<StoreDistance>, GeoError> {
        let band = DistanceBand::try_from(meters)?;
        self.tracker.record_access(poi_id).await;

        match self.cache.get(poi_id, band).await {
            CacheLookup::Hit { rows, tier } => {
                if let Some(rows) = self.serve_cached(poi_id, band, rows).await {
                    debug!(poi_id = %poi_id, band = %band, tier = ?tier, "Served from cache");
                    return Ok(rows);
                }
            }
            CacheLookup::Miss => self.metrics.record_miss(poi_id),
        }

        self.recompute(poi_id, band).await
    }

    /// Nearby stores joined with their details.
    ///
    /// Rows whose store no longer exists are skipped.
    pub async fn get_nearby_store_details(
        &self,
        poi_id: PoiId,
        meters: u32,
    ) -> Result<Vec<StoreInfo>, GeoError> {
        let rows = self.get_nearby_stores(poi_id, meters).await?;
        let ids: Vec<_> = rows.iter().map(|row| row.store_id).collect();
        let stores: HashMap<_, Store> = self
            .resolver
            .repository()
            .stores_by_ids(&ids)
            .await?
            .into_iter()
            .map(|store| (store.id, store))
            .collect();

        let mut details = Vec::with_capacity(rows.len());
        for row in rows {
            match stores.get(&row.store_id) {
                Some(store) => details.push(StoreInfo {
                    store_id: store.id,
                    name: store.name.clone(),
                    location: store.location,
                    distance_m: row.distance_m,
                }),
                None => warn!(store_id = %row.store_id, "Cached store no longer exists, skipping"),
            }
        }
        Ok(details)
    }

    /// Signal that a store was created or moved.
    ///
    /// Never blocks; returns false if invalidation was not queued.
    pub fn on_store_written(&self, store: &Store) -> bool {
        match &self.invalidation {
            Some(handle) => handle.on_store_written(store),
            None => {
                debug!(store_id = %store.id, "No invalidation channel attached");
                false
            }
        }
    }

    /// Whether a background refresh is running for the key.
    pub fn refresh_in_flight(&self, poi_id: PoiId, band: DistanceBand) -> bool {
        self.refreshing.contains(&CacheKey::new(poi_id, band))
    }

    pub fn metrics(&self) -> &Arc<CacheMetrics> {
        &self.metrics
    }

    pub fn cache(&self) -> &Arc<MultiTierCache> {
        &self.cache
    }

    pub fn staleness(&self) -> &Arc<StalenessTracker> {
        &self.staleness
    }

    pub fn access_tracker(&self) -> &Arc<AccessTracker> {
        &self.tracker
    }

    /// Decide whether a cache hit may be served. `None` means recompute.
    async fn serve_cached(
        &self,
        poi_id: PoiId,
        band: DistanceBand,
        rows: Arc<Vec<StoreDistance>>,
    ) -> Option<Vec<StoreDistance>> {
        let metadata = match self.staleness.get(poi_id, band).await {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!(
                    poi_id = %poi_id,
                    band = %band,
                    error = %e,
                    "Metadata read failed, treating entry as fresh"
                );
                None
            }
        };

        let Some(metadata) = metadata.filter(|m| m.is_stale) else {
            self.metrics.record_hit(poi_id, false);
            return Some(rows.as_ref().clone());
        };

        let hotspot = self.tracker.is_hotspot(poi_id).await.unwrap_or_else(|e| {
            warn!(poi_id = %poi_id, error = %e, "Hotspot lookup failed");
            false
        });

        if hotspot && !self.staleness.is_too_stale_record(&metadata) {
            self.metrics.record_hit(poi_id, true);
            self.spawn_refresh(poi_id, band);
            debug!(poi_id = %poi_id, band = %band, "Serving stale data for hotspot");
            return Some(rows.as_ref().clone());
        }

        debug!(poi_id = %poi_id, band = %band, hotspot, "Stale entry not servable, recomputing");
        self.metrics.record_miss(poi_id);
        None
    }

    async fn recompute(
        &self,
        poi_id: PoiId,
        band: DistanceBand,
    ) -> Result<Vec<StoreDistance>, GeoError> {
        let rows = self.resolver.nearby_stores(poi_id, band).await?;
        self.store_results(poi_id, band, &rows).await;
        Ok(rows)
    }

    /// Write recomputed rows and their metadata.
    ///
    /// Tier 1 is written before Tier 2, so the metadata follows the rows even
    /// when the Tier 2 write fails.
    async fn store_results(&self, poi_id: PoiId, band: DistanceBand, rows: &[StoreDistance]) {
        if let Err(e) = self.cache.put(poi_id, band, rows.to_vec()).await {
            warn!(poi_id = %poi_id, band = %band, error = %e, "Distributed cache write failed");
        }
        if rows.is_empty() {
            if let Err(e) = self.staleness.clear(poi_id, band).await {
                warn!(poi_id = %poi_id, band = %band, error = %e, "Metadata clear failed");
            }
            return;
        }
        if let Err(e) = self.staleness.mark_fresh(poi_id, band).await {
            warn!(poi_id = %poi_id, band = %band, error = %e, "Metadata write failed");
        }
    }

    fn spawn_refresh(&self, poi_id: PoiId, band: DistanceBand) {
        let key = CacheKey::new(poi_id, band);
        if !self.refreshing.insert(key) {
            debug!(poi_id = %poi_id, band = %band, "Refresh already in flight");
            return;
        }

        let service = self.clone();
        tokio::spawn(async move {
            match service.resolver.nearby_stores(poi_id, band).await {
                Ok(rows) => {
                    service.store_results(poi_id, band, &rows).await;
                    info!(
                        poi_id = %poi_id,
                        band = %band,
                        rows = rows.len(),
                        "Background cache refresh completed"
                    );
                }
                Err(e) => warn!(
                    poi_id = %poi_id,
                    band = %band,
                    error = %e,
                    "Background cache refresh failed"
                ),
            }
            service.refreshing.remove(&key);
        });
    }
}
