//! Per-POI invalidation decisions.

use std::sync::Arc;

use tracing::warn;

use crate::cache::BoxFuture;
use crate::hotspot::AccessTracker;
use crate::model::PoiId;

/// What to do with an affected POI's cached results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidationAction {
    /// Keep serving the data but flag every live band as stale.
    MarkStale,
    /// Drop every band from both tiers.
    Evict,
}

/// Chooses an [`InvalidationAction`] for each affected POI.
pub trait InvalidationPolicy: Send + Sync {
    /// Short name for logs and configuration.
    fn name(&self) -> &'static str;

    fn decide(&self, poi_id: PoiId) -> BoxFuture<'_, InvalidationAction>;
}

/// Evict every affected POI.
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysDelete;

impl InvalidationPolicy for AlwaysDelete {
    fn name(&self) -> &'static str {
        "always_delete"
    }

    fn decide(&self, _poi_id: PoiId) -> BoxFuture<'_, InvalidationAction> {
        Box::pin(async { InvalidationAction::Evict })
    }
}

/// Mark hotspots stale, evict everything else.
///
/// If the hotspot flag cannot be read the POI is evicted.
pub struct HotspotAware {
    tracker: Arc<AccessTracker>,
}

impl HotspotAware {
    pub fn new(tracker: Arc<AccessTracker>) -> Self {
        Self { tracker }
    }
}

impl InvalidationPolicy for HotspotAware {
    fn name(&self) -> &'static str {
        "hotspot_aware"
    }

    fn decide(&self, poi_id: PoiId) -> BoxFuture<'_, InvalidationAction> {
        Box::pin(async move {
            match self.tracker.is_hotspot(poi_id).await {
                Ok(true) => InvalidationAction::MarkStale,
                Ok(false) => InvalidationAction::Evict,
                Err(e) => {
                    warn!(poi_id = %poi_id, error = %e, "Hotspot lookup failed, evicting");
                    InvalidationAction::Evict
                }
            }
        })
    }
}
