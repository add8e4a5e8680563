//! Staleness tracking for cached result lists.
//!
//! Every (POI, band) entry has a small metadata hash next to it:
//!
//! ```text
//! poi:cache:metadata:{id}:{band}
//!   lastUpdated       RFC 3339 instant of the last recompute
//!   isStale           "true" | "false"
//!   staleReason       free text, empty when fresh
//!   scheduledRefresh  RFC 3339 instant, empty when fresh
//!   version           recompute counter, starts at 1
//! ```
//!
//! State machine:
//!
//! ```text
//!            mark_fresh (version + 1)
//!   ┌──────────────────────────────────────┐
//!   ▼                                      │
//! FRESH ──── mark_stale(reason) ────► STALE ──► too stale once
//!                                              now - lastUpdated > 2 × cache TTL
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::cache::traits::{DistributedStore, StoreError};
use crate::clock::Clock;
use crate::coord::DistanceBand;
use crate::model::PoiId;
use crate::threshold::ThresholdReader;

/// How long a metadata record outlives its last write.
pub const DEFAULT_METADATA_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Delay between marking an entry stale and its scheduled refresh.
pub const DEFAULT_REFRESH_DELAY: Duration = Duration::from_secs(5 * 60);

/// Stale reason used when a new store appears near a hotspot.
pub const REASON_NEW_STORE: &str = "new_store_added";

const FIELD_LAST_UPDATED: &str = "lastUpdated";
const FIELD_IS_STALE: &str = "isStale";
const FIELD_STALE_REASON: &str = "staleReason";
const FIELD_SCHEDULED_REFRESH: &str = "scheduledRefresh";
const FIELD_VERSION: &str = "version";

/// Key of the metadata hash for a (POI, band) entry.
pub fn metadata_key(poi_id: PoiId, band: DistanceBand) -> String {
    format!("poi:cache:metadata:{}:{}", poi_id, band.meters())
}

/// Freshness record for one cached result list.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheMetadata {
    pub last_updated: DateTime<Utc>,
    pub is_stale: bool,
    pub stale_reason: Option<String>,
    pub scheduled_refresh: Option<DateTime<Utc>>,
    pub version: u32,
}

impl CacheMetadata {
    fn to_fields(&self) -> Vec<(String, String)> {
        vec![
            (FIELD_LAST_UPDATED.into(), self.last_updated.to_rfc3339()),
            (FIELD_IS_STALE.into(), self.is_stale.to_string()),
            (
                FIELD_STALE_REASON.into(),
                self.stale_reason.clone().unwrap_or_default(),
            ),
            (
                FIELD_SCHEDULED_REFRESH.into(),
                self.scheduled_refresh
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_default(),
            ),
            (FIELD_VERSION.into(), self.version.to_string()),
        ]
    }

    fn from_fields(key: &str, fields: &HashMap<String, String>) -> Result<Self, StoreError> {
        let decode = |reason: String| StoreError::Decode {
            key: key.to_string(),
            reason,
        };
        let field = |name: &str| {
            fields
                .get(name)
                .map(String::as_str)
                .ok_or_else(|| decode(format!("missing field {}", name)))
        };
        let instant = |raw: &str| {
            DateTime::parse_from_rfc3339(raw)
                .map(|t| t.with_timezone(&Utc))
                .map_err(|e| decode(e.to_string()))
        };

        let last_updated = instant(field(FIELD_LAST_UPDATED)?)?;
        let is_stale = field(FIELD_IS_STALE)?
            .parse::<bool>()
            .map_err(|e| decode(e.to_string()))?;
        let stale_reason = fields
            .get(FIELD_STALE_REASON)
            .filter(|s| !s.is_empty())
            .cloned();
        let scheduled_refresh = match fields.get(FIELD_SCHEDULED_REFRESH) {
            Some(raw) if !raw.is_empty() => Some(instant(raw)?),
            _ => None,
        };
        let version = field(FIELD_VERSION)?
            .parse::<u32>()
            .map_err(|e| decode(e.to_string()))?;

        Ok(Self {
            last_updated,
            is_stale,
            stale_reason,
            scheduled_refresh,
            version,
        })
    }
}

/// Reads and writes [`CacheMetadata`] records in the distributed store.
pub struct StalenessTracker {
    store: Arc<dyn DistributedStore>,
    thresholds: Arc<dyn ThresholdReader>,
    clock: Arc<dyn Clock>,
    record_ttl: Duration,
    refresh_delay: Duration,
}

impl StalenessTracker {
    pub fn new(
        store: Arc<dyn DistributedStore>,
        thresholds: Arc<dyn ThresholdReader>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            thresholds,
            clock,
            record_ttl: DEFAULT_METADATA_TTL,
            refresh_delay: DEFAULT_REFRESH_DELAY,
        }
    }

    /// Override the record TTL.
    pub fn with_record_ttl(mut self, ttl: Duration) -> Self {
        self.record_ttl = ttl;
        self
    }

    /// Override the delay used for `scheduledRefresh`.
    pub fn with_refresh_delay(mut self, delay: Duration) -> Self {
        self.refresh_delay = delay;
        self
    }

    /// Load the record for an entry, if any.
    pub async fn get(
        &self,
        poi_id: PoiId,
        band: DistanceBand,
    ) -> Result<Option<CacheMetadata>, StoreError> {
        let key = metadata_key(poi_id, band);
        let fields = self.store.hgetall(&key).await?;
        if fields.is_empty() {
            return Ok(None);
        }
        CacheMetadata::from_fields(&key, &fields).map(Some)
    }

    /// Record a recompute: FRESH, `lastUpdated = now`, version + 1.
    pub async fn mark_fresh(
        &self,
        poi_id: PoiId,
        band: DistanceBand,
    ) -> Result<CacheMetadata, StoreError> {
        let version = match self.get(poi_id, band).await {
            Ok(Some(previous)) => previous.version.saturating_add(1),
            Ok(None) => 1,
            Err(StoreError::Decode { .. }) => 1,
            Err(e) => return Err(e),
        };
        let metadata = CacheMetadata {
            last_updated: self.clock.now(),
            is_stale: false,
            stale_reason: None,
            scheduled_refresh: None,
            version,
        };
        self.save(poi_id, band, &metadata).await?;
        debug!(poi_id = %poi_id, band = %band, version, "Cache metadata marked fresh");
        Ok(metadata)
    }

    /// Flag an entry as stale.
    ///
    /// `lastUpdated` and `version` are kept so staleness age is measured from
    /// the last real recompute. An entry with no record gets a new stale
    /// record at version 1.
    pub async fn mark_stale(
        &self,
        poi_id: PoiId,
        band: DistanceBand,
        reason: &str,
    ) -> Result<CacheMetadata, StoreError> {
        let now = self.clock.now();
        let (last_updated, version) = match self.get(poi_id, band).await? {
            Some(previous) => (previous.last_updated, previous.version),
            None => (now, 1),
        };
        let scheduled_refresh = chrono::Duration::from_std(self.refresh_delay)
            .ok()
            .and_then(|d| now.checked_add_signed(d));

        let metadata = CacheMetadata {
            last_updated,
            is_stale: true,
            stale_reason: Some(reason.to_string()),
            scheduled_refresh,
            version,
        };
        self.save(poi_id, band, &metadata).await?;
        info!(poi_id = %poi_id, band = %band, reason, "Cache marked stale");
        Ok(metadata)
    }

    /// True when the entry's record says STALE.
    pub async fn is_stale(&self, poi_id: PoiId, band: DistanceBand) -> Result<bool, StoreError> {
        Ok(self
            .get(poi_id, band)
            .await?
            .is_some_and(|m| m.is_stale))
    }

    /// True when a stale entry is older than twice the current cache TTL.
    pub async fn is_too_stale(
        &self,
        poi_id: PoiId,
        band: DistanceBand,
    ) -> Result<bool, StoreError> {
        Ok(self
            .get(poi_id, band)
            .await?
            .is_some_and(|m| self.is_too_stale_record(&m)))
    }

    /// Same check as [`is_too_stale`](Self::is_too_stale) on a loaded record.
    pub fn is_too_stale_record(&self, metadata: &CacheMetadata) -> bool {
        if !metadata.is_stale {
            return false;
        }
        let limit = self.thresholds.cache_ttl() * 2;
        match (self.clock.now() - metadata.last_updated).to_std() {
            Ok(age) => age > limit,
            Err(_) => false,
        }
    }

    /// Drop the record for an entry.
    pub async fn clear(&self, poi_id: PoiId, band: DistanceBand) -> Result<(), StoreError> {
        self.store.delete(vec![metadata_key(poi_id, band)]).await?;
        Ok(())
    }

    async fn save(
        &self,
        poi_id: PoiId,
        band: DistanceBand,
        metadata: &CacheMetadata,
    ) -> Result<(), StoreError> {
        let key = metadata_key(poi_id, band);
        self.store.hset_all(&key, metadata.to_fields()).await?;
        self.store.expire(&key, self.record_ttl).await?;
        Ok(())
    }
}
