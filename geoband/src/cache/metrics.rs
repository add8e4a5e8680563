//! Cache hit/miss/stale-serve metrics.
//!
//! Counters are lock-free atomics, kept both per POI and in aggregate. The
//! adaptive controller reads the aggregate snapshot each cycle; an hourly
//! persister copies it into the distributed store.
//!
//! ```text
//! Search service ─────► CacheMetrics ─────► CacheMetricsSnapshot ─────► controller
//!                       (atomic counters)   (point-in-time copy)   └──► cache:metrics:{hour}
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cache::traits::{DistributedStore, StoreError};
use crate::clock::Clock;
use crate::model::PoiId;

/// How long persisted hourly snapshots are kept.
pub const METRICS_RETENTION: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Key of the persisted snapshot for the hour containing `at`.
pub fn metrics_key(at: DateTime<Utc>) -> String {
    format!("cache:metrics:{}", at.format("%Y-%m-%d-%H"))
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    stale_served: AtomicU64,
}

impl Counters {
    fn record_hit(&self, stale: bool) {
        self.hits.fetch_add(1, Ordering::Relaxed);
        if stale {
            self.stale_served.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self, timestamp: DateTime<Utc>) -> CacheMetricsSnapshot {
        CacheMetricsSnapshot::from_counts(
            self.hits.load(Ordering::Relaxed),
            self.misses.load(Ordering::Relaxed),
            self.stale_served.load(Ordering::Relaxed),
            timestamp,
        )
    }
}

/// Point-in-time copy of cache counters with derived rates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheMetricsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub stale_served: u64,
    /// hits / (hits + misses), in percent.
    pub hit_rate: f64,
    /// misses / (hits + misses), in percent.
    pub miss_rate: f64,
    /// stale served / hits, in percent.
    pub stale_rate: f64,
    pub timestamp: DateTime<Utc>,
}

impl CacheMetricsSnapshot {
    pub fn from_counts(
        hits: u64,
        misses: u64,
        stale_served: u64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let total = hits + misses;
        let percent = |part: u64, whole: u64| {
            if whole == 0 {
                0.0
            } else {
                part as f64 / whole as f64 * 100.0
            }
        };
        Self {
            hits,
            misses,
            stale_served,
            hit_rate: percent(hits, total),
            miss_rate: percent(misses, total),
            stale_rate: percent(stale_served, hits),
            timestamp,
        }
    }
}

/// Cache counters per POI and system-wide.
pub struct CacheMetrics {
    total: Counters,
    per_poi: DashMap<PoiId, Counters>,
    clock: Arc<dyn Clock>,
}

impl CacheMetrics {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            total: Counters::default(),
            per_poi: DashMap::new(),
            clock,
        }
    }

    /// Record a served cache hit; `stale` marks a stale serve.
    pub fn record_hit(&self, poi_id: PoiId, stale: bool) {
        self.total.record_hit(stale);
        self.per_poi.entry(poi_id).or_default().record_hit(stale);
    }

    /// Record a cache miss.
    pub fn record_miss(&self, poi_id: PoiId) {
        self.total.record_miss();
        self.per_poi.entry(poi_id).or_default().record_miss();
    }

    /// Aggregate snapshot across every POI.
    pub fn system_snapshot(&self) -> CacheMetricsSnapshot {
        self.total.snapshot(self.clock.now())
    }

    /// Snapshot for one POI (all zeros if it was never seen).
    pub fn poi_snapshot(&self, poi_id: PoiId) -> CacheMetricsSnapshot {
        let now = self.clock.now();
        match self.per_poi.get(&poi_id) {
            Some(counters) => counters.snapshot(now),
            None => CacheMetricsSnapshot::from_counts(0, 0, 0, now),
        }
    }

    /// Number of POIs with per-POI counters.
    pub fn tracked_pois(&self) -> usize {
        self.per_poi.len()
    }

    /// Drop every per-POI counter. Aggregate counters are kept.
    ///
    /// Returns how many POIs were dropped.
    pub fn reset_poi_counters(&self) -> usize {
        let dropped = self.per_poi.len();
        self.per_poi.clear();
        dropped
    }

    /// Write the aggregate snapshot under the current hour's key.
    pub async fn persist_snapshot(
        &self,
        store: &dyn DistributedStore,
    ) -> Result<String, StoreError> {
        let snapshot = self.system_snapshot();
        let key = metrics_key(snapshot.timestamp);
        let json = serde_json::to_string(&snapshot).map_err(|e| StoreError::Decode {
            key: key.clone(),
            reason: e.to_string(),
        })?;
        store.set_with_ttl(&key, &json, METRICS_RETENTION).await?;
        debug!(
            key = %key,
            hit_rate = format!("{:.1}%", snapshot.hit_rate),
            stale_rate = format!("{:.1}%", snapshot.stale_rate),
            "Persisted cache metrics snapshot"
        );
        Ok(key)
    }
}
