//! Application configuration for GeoBandApp.
//!
//! `AppConfig` gathers the settings every component needs at startup.

use std::time::Duration;

use super::error::AppError;
use crate::config::{
    CacheSettings, ConfigFile, ControllerSettings, HotspotSettings, InvalidationSettings,
    PolicyKind,
};
use crate::threshold::{CACHE_TTL_RANGE, HOTSPOT_THRESHOLD_RANGE};

/// Interval between persisted metrics snapshots.
pub const DEFAULT_METRICS_PERSIST_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Top-level configuration passed to `GeoBandApp::start()`.
#[derive(Clone, Debug, PartialEq)]
pub struct AppConfig {
    pub cache: CacheSettings,
    pub hotspot: HotspotSettings,
    pub controller: ControllerSettings,
    pub invalidation: InvalidationSettings,
    /// How often aggregate cache metrics are written to the distributed store.
    pub metrics_persist_interval: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cache: CacheSettings::default(),
            hotspot: HotspotSettings::default(),
            controller: ControllerSettings::default(),
            invalidation: InvalidationSettings::default(),
            metrics_persist_interval: DEFAULT_METRICS_PERSIST_INTERVAL,
        }
    }
}

impl AppConfig {
    /// Create a config with every default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create application config from the configuration file.
    pub fn from_config_file(config: &ConfigFile) -> Self {
        Self {
            cache: config.cache.clone(),
            hotspot: config.hotspot.clone(),
            controller: config.controller.clone(),
            invalidation: config.invalidation.clone(),
            metrics_persist_interval: DEFAULT_METRICS_PERSIST_INTERVAL,
        }
    }

    /// Set the invalidation policy.
    pub fn with_policy(mut self, policy: PolicyKind) -> Self {
        self.invalidation.policy = policy;
        self
    }

    /// Set the controller interval.
    pub fn with_controller_interval(mut self, interval: Duration) -> Self {
        self.controller.interval = interval;
        self
    }

    /// Set the metrics persistence interval.
    pub fn with_metrics_persist_interval(mut self, interval: Duration) -> Self {
        self.metrics_persist_interval = interval;
        self
    }

    pub fn with_reevaluate_interval(mut self, interval: Duration) -> Self {
        self.hotspot.tracker.reevaluate_interval = interval;
        self
    }

    /// Check values a hand-built config could get wrong.
    pub(crate) fn validate(&self) -> Result<(), AppError> {
        if self.cache.local_capacity == 0 {
            return Err(AppError::Config("local cache capacity must be positive".into()));
        }
        if self.invalidation.channel_capacity == 0 {
            return Err(AppError::Config("invalidation channel capacity must be positive".into()));
        }
        if self.controller.interval.is_zero()
            || self.metrics_persist_interval.is_zero()
            || self.hotspot.tracker.reevaluate_interval.is_zero()
        {
            return Err(AppError::Config("background task intervals must be positive".into()));
        }
        if !HOTSPOT_THRESHOLD_RANGE.contains(&self.hotspot.initial_threshold) {
            return Err(AppError::Config(format!(
                "hotspot threshold {} outside {:?}",
                self.hotspot.initial_threshold, HOTSPOT_THRESHOLD_RANGE
            )));
        }
        if !CACHE_TTL_RANGE.contains(&self.controller.initial_cache_ttl_minutes) {
            return Err(AppError::Config(format!(
                "cache TTL {} minutes outside {:?}",
                self.controller.initial_cache_ttl_minutes, CACHE_TTL_RANGE
            )));
        }
        Ok(())
    }
}
