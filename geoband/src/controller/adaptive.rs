//! Adaptive threshold controller.
//!
//! Every cycle the controller samples system load and cache metrics and
//! nudges the thresholds. Rules are independent and additive; each one is
//! bounded by the ranges in [`crate::threshold`].
//!
//! | Signal                | Condition | Action                    |
//! |-----------------------|-----------|---------------------------|
//! | CPU utilization       | > 0.80    | hotspot threshold −10     |
//! | CPU utilization       | < 0.30    | hotspot threshold +10     |
//! | Memory utilization    | > 0.85    | cache TTL −5 min          |
//! | Cache hit rate        | < 70 %    | cache TTL +5 min          |
//! | Stale-serve rate      | > 20 %    | hotspot threshold −10     |
//!
//! A missing CPU or memory reading counts as 0.0. A failing metrics source
//! aborts the cycle with the thresholds untouched.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::system::{MetricsError, SystemMetricsSource};
use crate::cache::CacheMetrics;
use crate::threshold::{Adjustment, ThresholdState};

/// Default interval between controller cycles.
pub const DEFAULT_CONTROLLER_INTERVAL: Duration = Duration::from_secs(5 * 60);

pub const CPU_HIGH: f64 = 0.8;
pub const CPU_LOW: f64 = 0.3;
pub const MEMORY_HIGH: f64 = 0.85;
pub const MIN_HIT_RATE: f64 = 70.0;
pub const MAX_STALE_RATE: f64 = 20.0;

const HOTSPOT_STEP: i32 = 10;
const TTL_STEP: i32 = 5;

/// Errors that abort a controller cycle.
#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("System metrics unavailable: {0}")]
    Metrics(#[from] MetricsError),
}

/// Rule that fired during a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    HighCpu,
    LowCpu,
    HighMemory,
    LowHitRate,
    HighStaleRate,
}

/// What a cycle observed and changed.
#[derive(Debug, Clone, PartialEq)]
pub struct AdjustmentReport {
    pub cpu: f64,
    pub memory: f64,
    pub hit_rate: f64,
    pub stale_rate: f64,
    pub applied: Vec<(Rule, Adjustment)>,
}

impl AdjustmentReport {
    /// Rules that fired, in evaluation order.
    pub fn rules(&self) -> Vec<Rule> {
        self.applied.iter().map(|(rule, _)| *rule).collect()
    }
}

/// Tunes [`ThresholdState`] from live load signals.
pub struct AdaptiveThresholdController {
    thresholds: Arc<ThresholdState>,
    source: Arc<dyn SystemMetricsSource>,
    metrics: Arc<CacheMetrics>,
    interval: Duration,
}

impl AdaptiveThresholdController {
    pub fn new(
        thresholds: Arc<ThresholdState>,
        source: Arc<dyn SystemMetricsSource>,
        metrics: Arc<CacheMetrics>,
    ) -> Self {
        Self {
            thresholds,
            source,
            metrics,
            interval: DEFAULT_CONTROLLER_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Run one evaluation cycle.
    pub fn run_cycle(&self) -> Result<AdjustmentReport, ControllerError> {
        let load = self.source.sample()?;
        let cpu = load.cpu.unwrap_or(0.0);
        let memory = load.memory.unwrap_or(0.0);
        let cache = self.metrics.system_snapshot();

        let mut applied = Vec::new();

        if cpu > CPU_HIGH {
            let adj = self.thresholds.adjust_hotspot_threshold(-HOTSPOT_STEP);
            info!(
                cpu = format!("{:.0}%", cpu * 100.0),
                threshold = adj.to,
                "High CPU, decreased hotspot threshold"
            );
            applied.push((Rule::HighCpu, adj));
        } else if cpu < CPU_LOW {
            let adj = self.thresholds.adjust_hotspot_threshold(HOTSPOT_STEP);
            info!(
                cpu = format!("{:.0}%", cpu * 100.0),
                threshold = adj.to,
                "Low CPU, increased hotspot threshold"
            );
            applied.push((Rule::LowCpu, adj));
        }

        if memory > MEMORY_HIGH {
            let adj = self.thresholds.adjust_cache_ttl_minutes(-TTL_STEP);
            info!(
                memory = format!("{:.0}%", memory * 100.0),
                ttl_minutes = adj.to,
                "High memory, decreased cache TTL"
            );
            applied.push((Rule::HighMemory, adj));
        }

        if cache.hit_rate < MIN_HIT_RATE {
            let adj = self.thresholds.adjust_cache_ttl_minutes(TTL_STEP);
            info!(
                hit_rate = format!("{:.1}%", cache.hit_rate),
                ttl_minutes = adj.to,
                "Low hit rate, increased cache TTL"
            );
            applied.push((Rule::LowHitRate, adj));
        }

        if cache.stale_rate > MAX_STALE_RATE {
            let adj = self.thresholds.adjust_hotspot_threshold(-HOTSPOT_STEP);
            info!(
                stale_rate = format!("{:.1}%", cache.stale_rate),
                threshold = adj.to,
                "High stale rate, decreased hotspot threshold"
            );
            applied.push((Rule::HighStaleRate, adj));
        }

        Ok(AdjustmentReport {
            cpu,
            memory,
            hit_rate: cache.hit_rate,
            stale_rate: cache.stale_rate,
            applied,
        })
    }

    /// Run cycles on the configured interval until shutdown.
    ///
    /// The first cycle runs one full interval after start.
    pub async fn run(self, shutdown: CancellationToken) {
        info!(interval_secs = self.interval.as_secs(), "Threshold controller starting");

        let mut ticker = tokio::time::interval_at(
            tokio::time::Instant::now() + self.interval,
            self.interval,
        );
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    info!("Threshold controller shutting down");
                    break;
                }

                _ = ticker.tick() => {
                    match self.run_cycle() {
                        Ok(report) => debug!(
                            rules = ?report.rules(),
                            cpu = report.cpu,
                            memory = report.memory,
                            "Threshold controller cycle complete"
                        ),
                        Err(e) => {
                            error!(error = %e, "Threshold adjustment failed, thresholds unchanged")
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::controller::system::{FixedMetricsSource, SystemLoad};
    use crate::model::PoiId;
    use crate::threshold::ThresholdReader;

    struct Fixture {
        controller: AdaptiveThresholdController,
        thresholds: Arc<ThresholdState>,
        source: Arc<FixedMetricsSource>,
        metrics: Arc<CacheMetrics>,
    }

    fn fixture(cpu: Option<f64>, memory: Option<f64>) -> Fixture {
        let thresholds = Arc::new(ThresholdState::default());
        let source = Arc::new(FixedMetricsSource::new(SystemLoad { cpu, memory }));
        let metrics = Arc::new(CacheMetrics::new(Arc::new(SystemClock)));
        let controller =
            AdaptiveThresholdController::new(thresholds.clone(), source.clone(), metrics.clone());
        Fixture {
            controller,
            thresholds,
            source,
            metrics,
        }
    }

    /// Record hits so the hit-rate rule stays quiet.
    fn healthy_traffic(metrics: &CacheMetrics) {
        for _ in 0..10 {
            metrics.record_hit(PoiId(1), false);
        }
    }

    #[test]
    fn test_high_cpu_lowers_hotspot_threshold() {
        let f = fixture(Some(0.9), Some(0.5));
        healthy_traffic(&f.metrics);

        let report = f.controller.run_cycle().unwrap();
        assert_eq!(report.rules(), vec![Rule::HighCpu]);
        assert_eq!(f.thresholds.hotspot_threshold(), 90);
        assert_eq!(f.thresholds.cache_ttl_minutes(), 30);
    }

    #[test]
    fn test_low_cpu_raises_hotspot_threshold() {
        let f = fixture(Some(0.1), Some(0.5));
        healthy_traffic(&f.metrics);

        f.controller.run_cycle().unwrap();
        assert_eq!(f.thresholds.hotspot_threshold(), 110);
    }

    #[test]
    fn test_moderate_cpu_changes_nothing() {
        let f = fixture(Some(0.5), Some(0.5));
        healthy_traffic(&f.metrics);

        let report = f.controller.run_cycle().unwrap();
        assert!(report.applied.is_empty());
        assert_eq!(f.thresholds.hotspot_threshold(), 100);
    }

    #[test]
    fn test_high_memory_and_low_hit_rate_cancel_out() {
        let f = fixture(Some(0.5), Some(0.9));
        f.metrics.record_miss(PoiId(1));

        let report = f.controller.run_cycle().unwrap();
        assert_eq!(report.rules(), vec![Rule::HighMemory, Rule::LowHitRate]);
        assert_eq!(f.thresholds.cache_ttl_minutes(), 30);
    }

    #[test]
    fn test_stale_rate_stacks_with_high_cpu() {
        let f = fixture(Some(0.95), Some(0.5));
        for _ in 0..10 {
            f.metrics.record_hit(PoiId(1), true);
        }

        let report = f.controller.run_cycle().unwrap();
        assert_eq!(report.rules(), vec![Rule::HighCpu, Rule::HighStaleRate]);
        assert_eq!(f.thresholds.hotspot_threshold(), 80);
    }

    #[test]
    fn test_missing_readings_count_as_zero() {
        let f = fixture(None, None);
        healthy_traffic(&f.metrics);

        let report = f.controller.run_cycle().unwrap();
        assert_eq!(report.cpu, 0.0);
        assert_eq!(report.rules(), vec![Rule::LowCpu]);
        assert_eq!(f.thresholds.hotspot_threshold(), 110);
    }

    #[test]
    fn test_source_failure_leaves_state_unchanged() {
        let f = fixture(Some(0.95), Some(0.95));
        f.source.set_failing(true);

        assert!(f.controller.run_cycle().is_err());
        assert_eq!(f.thresholds.hotspot_threshold(), 100);
        assert_eq!(f.thresholds.cache_ttl_minutes(), 30);
    }

    #[test]
    fn test_bounds_hold_over_many_cycles() {
        let f = fixture(Some(0.99), Some(0.99));
        healthy_traffic(&f.metrics);
        for _ in 0..30 {
            f.controller.run_cycle().unwrap();
        }
        assert_eq!(f.thresholds.hotspot_threshold(), 50);
        assert_eq!(f.thresholds.cache_ttl_minutes(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_loop_ticks_and_stops() {
        let f = fixture(Some(0.9), Some(0.5));
        healthy_traffic(&f.metrics);
        let thresholds = f.thresholds.clone();
        let controller = f.controller.with_interval(Duration::from_secs(300));

        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(controller.run(shutdown.clone()));

        tokio::time::sleep(Duration::from_secs(301)).await;
        assert_eq!(thresholds.hotspot_threshold(), 90);

        shutdown.cancel();
        handle.await.unwrap();
    }
}
