//! Per-POI access tracking and hotspot detection.
//!
//! Three keys per POI live in the distributed store:
//!
//! | Key                      | Value              | TTL                      |
//! |--------------------------|--------------------|--------------------------|
//! | `poi:access:count:{id}`  | hourly counter     | 1 h, set on first access |
//! | `poi:last_access:{id}`   | RFC 3339 instant   | 7 d, refreshed each time |
//! | `poi:hotspot:{id}`       | `"true"`           | 24 h, refreshed on promotion |
//!
//! A POI whose hourly count reaches the current hotspot threshold is
//! (re)promoted. Once per re-evaluation interval the tracker demotes flagged
//! POIs whose count fell below the threshold, promotes unflagged ones at or
//! above it, and resets every counter:
//!
//! ```text
//! count keys ──► counts ──┬─► flagged, count < threshold ──► delete flag
//!                         ├─► unflagged, count ≥ threshold ─► set flag
//!                         └─► delete every count key
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::cache::{DistributedStore, StoreError};
use crate::clock::Clock;
use crate::model::PoiId;
use crate::threshold::ThresholdReader;

const ACCESS_COUNT_PREFIX: &str = "poi:access:count:";
const HOTSPOT_PREFIX: &str = "poi:hotspot:";
const LAST_ACCESS_PREFIX: &str = "poi:last_access:";

/// Default interval between hotspot re-evaluations.
pub const DEFAULT_REEVALUATE_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Key TTLs and re-evaluation cadence used by the access tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessTrackerConfig {
    /// Window of the access counter.
    pub counter_window: Duration,
    /// Lifetime of a hotspot flag after its last promotion.
    pub hotspot_ttl: Duration,
    /// Lifetime of the last-access timestamp.
    pub last_access_ttl: Duration,
    /// Interval between [`AccessTracker::reevaluate_hotspots`] runs.
    pub reevaluate_interval: Duration,
}

impl Default for AccessTrackerConfig {
    fn default() -> Self {
        Self {
            counter_window: Duration::from_secs(60 * 60),
            hotspot_ttl: Duration::from_secs(24 * 60 * 60),
            last_access_ttl: Duration::from_secs(7 * 24 * 60 * 60),
            reevaluate_interval: DEFAULT_REEVALUATE_INTERVAL,
        }
    }
}

/// What one re-evaluation pass changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReevaluationReport {
    /// Threshold in force during the pass.
    pub threshold: u32,
    pub promoted: Vec<PoiId>,
    pub demoted: Vec<PoiId>,
    /// Access counters deleted for the next window.
    pub counters_reset: u64,
    /// Flagged POIs after the pass.
    pub total_hotspots: usize,
}

/// Counts POI accesses and maintains hotspot flags.
pub struct AccessTracker {
    store: Arc<dyn DistributedStore>,
    thresholds: Arc<dyn ThresholdReader>,
    clock: Arc<dyn Clock>,
    config: AccessTrackerConfig,
}

impl AccessTracker {
    pub fn new(
        store: Arc<dyn DistributedStore>,
        thresholds: Arc<dyn ThresholdReader>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            thresholds,
            clock,
            config: AccessTrackerConfig::default(),
        }
    }

    pub fn with_config(mut self, config: AccessTrackerConfig) -> Self {
        self.config = config;
        self
    }

    /// Record one access. Store failures are logged and swallowed.
    pub async fn record_access(&self, poi_id: PoiId) {
        if let Err(e) = self.try_record_access(poi_id).await {
            error!(poi_id = %poi_id, error = %e, "Failed to record POI access");
        }
    }

    /// Record one access, returning the new hourly count.
    pub async fn try_record_access(&self, poi_id: PoiId) -> Result<i64, StoreError> {
        let count = self
            .store
            .incr_with_ttl(&count_key(poi_id), self.config.counter_window)
            .await?;

        self.store
            .set_with_ttl(
                &last_access_key(poi_id),
                &self.clock.now().to_rfc3339(),
                self.config.last_access_ttl,
            )
            .await?;

        let threshold = i64::from(self.thresholds.hotspot_threshold());
        if count >= threshold {
            self.store
                .set_with_ttl(&hotspot_key(poi_id), "true", self.config.hotspot_ttl)
                .await?;
            if count == threshold {
                info!(poi_id = %poi_id, count, threshold, "POI promoted to hotspot");
            }
        }

        debug!(poi_id = %poi_id, count, "Recorded POI access");
        Ok(count)
    }

    /// Whether the POI currently carries a hotspot flag.
    pub async fn is_hotspot(&self, poi_id: PoiId) -> Result<bool, StoreError> {
        Ok(self
            .store
            .get(&hotspot_key(poi_id))
            .await?
            .is_some_and(|v| v == "true"))
    }

    /// Accesses in the current window (0 when none).
    pub async fn current_access_count(&self, poi_id: PoiId) -> Result<i64, StoreError> {
        match self.store.get(&count_key(poi_id)).await? {
            Some(raw) => raw.parse::<i64>().map_err(|e| StoreError::Decode {
                key: count_key(poi_id),
                reason: e.to_string(),
            }),
            None => Ok(0),
        }
    }

    /// Time of the most recent access, if within the retention window.
    pub async fn last_access_time(
        &self,
        poi_id: PoiId,
    ) -> Result<Option<DateTime<Utc>>, StoreError> {
        let Some(raw) = self.store.get(&last_access_key(poi_id)).await? else {
            return Ok(None);
        };
        DateTime::parse_from_rfc3339(&raw)
            .map(|t| Some(t.with_timezone(&Utc)))
            .map_err(|e| StoreError::Decode {
                key: last_access_key(poi_id),
                reason: e.to_string(),
            })
    }

    /// Every POI currently flagged as a hotspot, ascending.
    pub async fn hotspots(&self) -> Result<Vec<PoiId>, StoreError> {
        let keys = self.store.keys_with_prefix(HOTSPOT_PREFIX).await?;
        let mut ids: Vec<PoiId> = keys
            .iter()
            .filter_map(|k| poi_id_from_key(k, HOTSPOT_PREFIX))
            .collect();
        ids.sort_unstable();
        Ok(ids)
    }

    /// Re-check every flag against the current counts, then reset counters.
    ///
    /// A counter value that does not parse counts as 0.
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects a key scan or write; the pass
    /// stops at that point.
    pub async fn reevaluate_hotspots(&self) -> Result<ReevaluationReport, StoreError> {
        let threshold = self.thresholds.hotspot_threshold();
        let mut report = ReevaluationReport {
            threshold,
            ..ReevaluationReport::default()
        };

        let count_keys = self.store.keys_with_prefix(ACCESS_COUNT_PREFIX).await?;
        let mut counts: HashMap<PoiId, i64> = HashMap::with_capacity(count_keys.len());
        for key in &count_keys {
            let Some(poi_id) = poi_id_from_key(key, ACCESS_COUNT_PREFIX) else {
                continue;
            };
            let count = self
                .store
                .get(key)
                .await?
                .and_then(|raw| raw.parse::<i64>().ok())
                .unwrap_or(0);
            counts.insert(poi_id, count);
        }

        let threshold = i64::from(threshold);
        let flagged = self.hotspots().await?;

        for &poi_id in &flagged {
            let count = counts.get(&poi_id).copied().unwrap_or(0);
            if count < threshold {
                self.store.delete(vec![hotspot_key(poi_id)]).await?;
                info!(poi_id = %poi_id, count, threshold, "POI demoted from hotspot");
                report.demoted.push(poi_id);
            }
        }

        let mut candidates: Vec<_> = counts
            .iter()
            .filter(|(poi_id, count)| **count >= threshold && !flagged.contains(poi_id))
            .map(|(poi_id, _)| *poi_id)
            .collect();
        candidates.sort_unstable();
        for poi_id in candidates {
            self.store
                .set_with_ttl(&hotspot_key(poi_id), "true", self.config.hotspot_ttl)
                .await?;
            info!(poi_id = %poi_id, threshold, "POI promoted to hotspot on re-evaluation");
            report.promoted.push(poi_id);
        }

        if !count_keys.is_empty() {
            report.counters_reset = self.store.delete(count_keys).await?;
        }
        report.total_hotspots = self.hotspots().await?.len();

        info!(
            promoted = report.promoted.len(),
            demoted = report.demoted.len(),
            counters_reset = report.counters_reset,
            total = report.total_hotspots,
            threshold,
            "Hotspot re-evaluation completed"
        );
        Ok(report)
    }

    /// Run [`reevaluate_hotspots`](Self::reevaluate_hotspots) on the
    /// configured interval until shutdown.
    pub async fn run_reevaluation(self: Arc<Self>, shutdown: CancellationToken) {
        let interval = self.config.reevaluate_interval;
        info!(interval_secs = interval.as_secs(), "Hotspot re-evaluation starting");

        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    info!("Hotspot re-evaluation shutting down");
                    break;
                }

                _ = ticker.tick() => {
                    if let Err(e) = self.reevaluate_hotspots().await {
                        error!(error = %e, "Hotspot re-evaluation failed");
                    }
                }
            }
        }
    }
}

fn poi_id_from_key(key: &str, prefix: &str) -> Option<PoiId> {
    key.strip_prefix(prefix)?.parse().ok().map(PoiId)
}

fn count_key(poi_id: PoiId) -> String {
    format!("{}{}", ACCESS_COUNT_PREFIX, poi_id)
}

fn hotspot_key(poi_id: PoiId) -> String {
    format!("{}{}", HOTSPOT_PREFIX, poi_id)
}

fn last_access_key(poi_id: PoiId) -> String {
    format!("{}{}", LAST_ACCESS_PREFIX, poi_id)
}
