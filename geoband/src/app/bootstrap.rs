//! Application bootstrap implementation.
//!
//! Builds the component graph from an [`AppConfig`] and starts the
//! background tasks:
//!
//! | Task                   | Period                                |
//! |------------------------|---------------------------------------|
//! | `threshold-controller` | `controller.interval`                 |
//! | `invalidation-worker`  | event driven                          |
//! | `metrics-persister`    | `metrics_persist_interval`            |
//! | `hotspot-reevaluator`  | `hotspot.tracker.reevaluate_interval` |

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::config::AppConfig;
use super::error::AppError;
use crate::cache::{
    CacheMetrics, DistributedStore, DistributedTier, LocalTier, MultiTierCache, StalenessTracker,
};
use crate::clock::{self, Clock};
use crate::config::PolicyKind;
use crate::controller::{AdaptiveThresholdController, SystemMetricsSource};
use crate::hotspot::AccessTracker;
use crate::invalidation::{
    AlwaysDelete, HotspotAware, InvalidationHandler, InvalidationPolicy, InvalidationWorker,
};
use crate::repository::CandidateRepository;
use crate::resolver::SpatialResolver;
use crate::service::SpatialSearchService;
use crate::threshold::ThresholdState;

/// Running application: the search service plus its background tasks.
pub struct GeoBandApp {
    service: SpatialSearchService,
    thresholds: Arc<ThresholdState>,
    shutdown: CancellationToken,
    tasks: Vec<(&'static str, JoinHandle<()>)>,
}

impl GeoBandApp {
    /// Start the application on the current Tokio runtime.
    ///
    /// # Arguments
    ///
    /// * `config` - Application configuration
    /// * `repository` - POI and store data
    /// * `store` - Distributed cache store (Tier 2, metadata, access counters)
    /// * `metrics_source` - CPU and memory readings for the controller
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or no runtime is
    /// available.
    pub fn start(
        config: AppConfig,
        repository: Arc<dyn CandidateRepository>,
        store: Arc<dyn DistributedStore>,
        metrics_source: Arc<dyn SystemMetricsSource>,
    ) -> Result<Self, AppError> {
        Self::start_with_clock(config, repository, store, metrics_source, clock::system())
    }

    /// Start with an explicit clock.
    pub fn start_with_clock(
        config: AppConfig,
        repository: Arc<dyn CandidateRepository>,
        store: Arc<dyn DistributedStore>,
        metrics_source: Arc<dyn SystemMetricsSource>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, AppError> {
        config.validate()?;
        tokio::runtime::Handle::try_current().map_err(|_| AppError::NoRuntime)?;

        info!(
            policy = %config.invalidation.policy,
            hotspot_threshold = config.hotspot.initial_threshold,
            cache_ttl_minutes = config.controller.initial_cache_ttl_minutes,
            "Starting GeoBandApp"
        );

        let thresholds = Arc::new(ThresholdState::new(
            config.hotspot.initial_threshold,
            config.controller.initial_cache_ttl_minutes,
        ));

        // 1. Cache tiers and trackers
        let cache = Arc::new(MultiTierCache::new(
            LocalTier::new(config.cache.local_capacity, config.cache.local_ttl),
            DistributedTier::new(store.clone(), thresholds.clone()),
        ));
        let staleness = Arc::new(
            StalenessTracker::new(store.clone(), thresholds.clone(), clock.clone())
                .with_record_ttl(config.cache.metadata_ttl)
                .with_refresh_delay(config.cache.stale_refresh_delay),
        );
        let tracker = Arc::new(
            AccessTracker::new(store.clone(), thresholds.clone(), clock.clone())
                .with_config(config.hotspot.tracker),
        );
        let metrics = Arc::new(CacheMetrics::new(clock));
        let resolver = SpatialResolver::new(repository);

        info!(
            local_capacity = config.cache.local_capacity,
            local_ttl_secs = config.cache.local_ttl.as_secs(),
            "Cache tiers ready"
        );

        // 2. Invalidation
        let policy: Arc<dyn InvalidationPolicy> = match config.invalidation.policy {
            PolicyKind::HotspotAware => Arc::new(HotspotAware::new(tracker.clone())),
            PolicyKind::AlwaysDelete => Arc::new(AlwaysDelete),
        };
        let handler = Arc::new(InvalidationHandler::new(
            resolver.clone(),
            cache.clone(),
            staleness.clone(),
            policy,
        ));
        let (worker, handle) =
            InvalidationWorker::new(handler, config.invalidation.channel_capacity);

        let service = SpatialSearchService::new(
            resolver,
            cache,
            staleness,
            tracker.clone(),
            metrics.clone(),
        )
        .with_invalidation(handle);

        // 3. Background tasks
        let shutdown = CancellationToken::new();
        let controller =
            AdaptiveThresholdController::new(thresholds.clone(), metrics_source, metrics.clone())
                .with_interval(config.controller.interval);

        let tasks = vec![
            ("threshold-controller", tokio::spawn(controller.run(shutdown.clone()))),
            ("invalidation-worker", tokio::spawn(worker.run(shutdown.clone()))),
            (
                "metrics-persister",
                tokio::spawn(persist_metrics(
                    metrics,
                    store,
                    config.metrics_persist_interval,
                    shutdown.clone(),
                )),
            ),
            ("hotspot-reevaluator", tokio::spawn(tracker.run_reevaluation(shutdown.clone()))),
        ];

        info!(tasks = tasks.len(), "GeoBandApp started");

        Ok(Self {
            service,
            thresholds,
            shutdown,
            tasks,
        })
    }

    /// The search service. Clones share all state.
    pub fn service(&self) -> &SpatialSearchService {
        &self.service
    }

    /// Current thresholds.
    pub fn thresholds(&self) -> &Arc<ThresholdState> {
        &self.thresholds
    }

    /// Token that stops every background task when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Stop the background tasks and wait for them to finish.
    pub async fn shutdown(self) {
        info!("Shutting down GeoBandApp");
        self.shutdown.cancel();

        let (names, handles): (Vec<_>, Vec<_>) = self.tasks.into_iter().unzip();
        let results = futures::future::join_all(handles).await;
        for (name, result) in names.into_iter().zip(results) {
            match result {
                Ok(()) => debug!(task = name, "Background task stopped"),
                Err(e) => warn!(task = name, error = %e, "Background task ended abnormally"),
            }
        }

        info!("GeoBandApp shutdown complete");
    }
}

/// Write an aggregate metrics snapshot every `interval` until shutdown.
///
/// Per-POI counters restart after each successful write.
async fn persist_metrics(
    metrics: Arc<CacheMetrics>,
    store: Arc<dyn DistributedStore>,
    interval: Duration,
    shutdown: CancellationToken,
) {
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;

            _ = shutdown.cancelled() => break,

            _ = ticker.tick() => {
                match metrics.persist_snapshot(store.as_ref()).await {
                    Ok(_) => {
                        let dropped = metrics.reset_poi_counters();
                        debug!(pois = dropped, "Reset per-POI cache counters");
                    }
                    Err(e) => warn!(error = %e, "Failed to persist cache metrics"),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{metrics_key, MemoryStore};
    use crate::clock::ManualClock;
    use crate::controller::{FixedMetricsSource, SystemLoad};
    use crate::coord::{fixtures::offset_north, GeoPoint};
    use crate::model::{Poi, PoiId, Store, StoreId};
    use crate::repository::InMemoryRepository;
    use crate::threshold::ThresholdReader;

    const CENTER: GeoPoint = GeoPoint::new(37.5, 127.03);

    fn repository() -> Arc<InMemoryRepository> {
        Arc::new(InMemoryRepository::with_records(
            [Poi::new(PoiId(1), "station", "transit", CENTER).unwrap()],
            [Store::new(StoreId(10), "near", offset_north(CENTER, 120.0)).unwrap()],
        ))
    }

    #[test]
    fn test_start_without_runtime_fails() {
        let clock = ManualClock::starting_now();
        let result = GeoBandApp::start_with_clock(
            AppConfig::new(),
            repository(),
            Arc::new(MemoryStore::new(clock.clone())),
            Arc::new(FixedMetricsSource::default()),
            clock,
        );
        assert!(matches!(result, Err(AppError::NoRuntime)));
    }

    #[tokio::test]
    async fn test_start_serve_and_shutdown() {
        let clock = ManualClock::starting_now();
        let app = GeoBandApp::start_with_clock(
            AppConfig::new(),
            repository(),
            Arc::new(MemoryStore::new(clock.clone())),
            Arc::new(FixedMetricsSource::default()),
            clock,
        )
        .unwrap();

        let rows = app.service().get_nearby_stores(PoiId(1), 300).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].distance_m, 120);

        let store = Store::new(StoreId(11), "new", CENTER).unwrap();
        assert!(app.service().on_store_written(&store));

        app.shutdown().await;
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected() {
        let clock = ManualClock::starting_now();
        let mut config = AppConfig::new();
        config.cache.local_capacity = 0;
        let result = GeoBandApp::start_with_clock(
            config,
            repository(),
            Arc::new(MemoryStore::new(clock.clone())),
            Arc::new(FixedMetricsSource::default()),
            clock,
        );
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_background_tasks_tick() {
        let clock = ManualClock::starting_now();
        let store = Arc::new(MemoryStore::new(clock.clone()));
        let config = AppConfig::new()
            .with_controller_interval(Duration::from_secs(60))
            .with_metrics_persist_interval(Duration::from_secs(60))
            .with_reevaluate_interval(Duration::from_secs(60));
        let source = Arc::new(FixedMetricsSource::new(SystemLoad {
            cpu: Some(0.95),
            memory: Some(0.5),
        }));
        let app = GeoBandApp::start_with_clock(
            config,
            repository(),
            store.clone(),
            source,
            clock.clone(),
        )
        .unwrap();

        app.service().get_nearby_stores(PoiId(1), 300).await.unwrap();
        assert_eq!(app.service().metrics().tracked_pois(), 1);
        let tracker = app.service().access_tracker().clone();
        assert_eq!(tracker.current_access_count(PoiId(1)).await.unwrap(), 1);

        tokio::time::sleep(Duration::from_secs(61)).await;

        assert_eq!(app.thresholds().hotspot_threshold(), 90);
        let key = metrics_key(clock.now());
        assert!(store.get(&key).await.unwrap().is_some());
        assert_eq!(app.service().metrics().tracked_pois(), 0);
        assert_eq!(app.service().metrics().system_snapshot().misses, 1);
        assert_eq!(tracker.current_access_count(PoiId(1)).await.unwrap(), 0);

        app.shutdown().await;
    }
}
