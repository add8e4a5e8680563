//! INI configuration file.
//!
//! Every key is optional. A missing file yields the defaults.
//!
//! ```ini
//! [cache]
//! local_capacity = 10
//! local_ttl_minutes = 60
//! stale_refresh_delay_minutes = 5
//! metadata_ttl_days = 7
//!
//! [hotspot]
//! initial_threshold = 100
//! counter_window_minutes = 60
//! hotspot_ttl_hours = 24
//! last_access_ttl_days = 7
//! reevaluate_interval_minutes = 60
//!
//! [controller]
//! interval_secs = 300
//! initial_cache_ttl_minutes = 30
//!
//! [invalidation]
//! channel_capacity = 1024
//! policy = hotspot_aware
//!
//! [logging]
//! directory = /var/log/geoband
//! file_name = geoband.log
//! level = info
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use ini::{Ini, Properties};
use thiserror::Error;

use crate::cache::local::{DEFAULT_LOCAL_CAPACITY, DEFAULT_LOCAL_TTL};
use crate::cache::metadata::{DEFAULT_METADATA_TTL, DEFAULT_REFRESH_DELAY};
use crate::controller::DEFAULT_CONTROLLER_INTERVAL;
use crate::hotspot::AccessTrackerConfig;
use crate::invalidation::DEFAULT_INVALIDATION_CHANNEL_CAPACITY;
use crate::threshold::{
    CACHE_TTL_RANGE, DEFAULT_CACHE_TTL_MINUTES, DEFAULT_HOTSPOT_THRESHOLD,
    HOTSPOT_THRESHOLD_RANGE,
};

/// Directory under the home directory holding the config file.
pub const CONFIG_DIR_NAME: &str = ".geoband";

/// Config file name.
pub const CONFIG_FILE_NAME: &str = "config.ini";

/// Default log file name.
pub const DEFAULT_LOG_FILE_NAME: &str = "geoband.log";

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Errors loading or validating a config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: ini::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] ini::ParseError),

    #[error("Invalid value '{value}' for [{section}] {key}: {reason}")]
    InvalidValue {
        section: &'static str,
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// How store writes invalidate nearby cache entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PolicyKind {
    /// Mark hotspots stale, evict the rest.
    #[default]
    HotspotAware,
    /// Evict every affected POI.
    AlwaysDelete,
}

impl FromStr for PolicyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hotspot_aware" => Ok(Self::HotspotAware),
            "always_delete" => Ok(Self::AlwaysDelete),
            other => Err(format!(
                "unknown policy '{}', expected hotspot_aware or always_delete",
                other
            )),
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HotspotAware => f.write_str("hotspot_aware"),
            Self::AlwaysDelete => f.write_str("always_delete"),
        }
    }
}

/// `[cache]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheSettings {
    pub local_capacity: u64,
    pub local_ttl: Duration,
    pub stale_refresh_delay: Duration,
    pub metadata_ttl: Duration,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            local_capacity: DEFAULT_LOCAL_CAPACITY,
            local_ttl: DEFAULT_LOCAL_TTL,
            stale_refresh_delay: DEFAULT_REFRESH_DELAY,
            metadata_ttl: DEFAULT_METADATA_TTL,
        }
    }
}

/// `[hotspot]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct HotspotSettings {
    pub initial_threshold: u32,
    pub tracker: AccessTrackerConfig,
}

impl Default for HotspotSettings {
    fn default() -> Self {
        Self {
            initial_threshold: DEFAULT_HOTSPOT_THRESHOLD,
            tracker: AccessTrackerConfig::default(),
        }
    }
}

/// `[controller]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerSettings {
    pub interval: Duration,
    pub initial_cache_ttl_minutes: u32,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            interval: DEFAULT_CONTROLLER_INTERVAL,
            initial_cache_ttl_minutes: DEFAULT_CACHE_TTL_MINUTES,
        }
    }
}

/// `[invalidation]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct InvalidationSettings {
    pub channel_capacity: usize,
    pub policy: PolicyKind,
}

impl Default for InvalidationSettings {
    fn default() -> Self {
        Self {
            channel_capacity: DEFAULT_INVALIDATION_CHANNEL_CAPACITY,
            policy: PolicyKind::default(),
        }
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingSettings {
    /// Directory for the log file; `None` logs to stderr only.
    pub directory: Option<PathBuf>,
    pub file_name: String,
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            directory: None,
            file_name: DEFAULT_LOG_FILE_NAME.to_string(),
            level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

/// Parsed configuration file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigFile {
    pub cache: CacheSettings,
    pub hotspot: HotspotSettings,
    pub controller: ControllerSettings,
    pub invalidation: InvalidationSettings,
    pub logging: LoggingSettings,
}

/// Default config path, `~/.geoband/config.ini`.
pub fn config_file_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR_NAME)
        .join(CONFIG_FILE_NAME)
}

impl ConfigFile {
    /// Load from a path, falling back to defaults if the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or contains
    /// invalid values.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Load from a path.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_file(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_ini(&ini)
    }

    /// Parse INI text.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_str(text)?;
        Self::from_ini(&ini)
    }

    fn from_ini(ini: &Ini) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(props) = ini.section(Some("cache")) {
            let cache = &mut config.cache;
            cache.local_capacity =
                positive(props, "cache", "local_capacity", cache.local_capacity)?;
            cache.local_ttl = minutes(props, "cache", "local_ttl_minutes", cache.local_ttl)?;
            cache.stale_refresh_delay = minutes(
                props,
                "cache",
                "stale_refresh_delay_minutes",
                cache.stale_refresh_delay,
            )?;
            cache.metadata_ttl = days(props, "cache", "metadata_ttl_days", cache.metadata_ttl)?;
        }

        if let Some(props) = ini.section(Some("hotspot")) {
            let hotspot = &mut config.hotspot;
            hotspot.initial_threshold =
                value(props, "hotspot", "initial_threshold", hotspot.initial_threshold)?;
            if !HOTSPOT_THRESHOLD_RANGE.contains(&hotspot.initial_threshold) {
                return Err(out_of_range(
                    "hotspot",
                    "initial_threshold",
                    hotspot.initial_threshold,
                    &HOTSPOT_THRESHOLD_RANGE,
                ));
            }
            let tracker = &mut hotspot.tracker;
            tracker.counter_window =
                minutes(props, "hotspot", "counter_window_minutes", tracker.counter_window)?;
            tracker.hotspot_ttl =
                hours(props, "hotspot", "hotspot_ttl_hours", tracker.hotspot_ttl)?;
            tracker.last_access_ttl =
                days(props, "hotspot", "last_access_ttl_days", tracker.last_access_ttl)?;
            tracker.reevaluate_interval = minutes(
                props,
                "hotspot",
                "reevaluate_interval_minutes",
                tracker.reevaluate_interval,
            )?;
        }

        if let Some(props) = ini.section(Some("controller")) {
            let controller = &mut config.controller;
            let secs = positive(
                props,
                "controller",
                "interval_secs",
                controller.interval.as_secs(),
            )?;
            controller.interval = Duration::from_secs(secs);
            controller.initial_cache_ttl_minutes = value(
                props,
                "controller",
                "initial_cache_ttl_minutes",
                controller.initial_cache_ttl_minutes,
            )?;
            if !CACHE_TTL_RANGE.contains(&controller.initial_cache_ttl_minutes) {
                return Err(out_of_range(
                    "controller",
                    "initial_cache_ttl_minutes",
                    controller.initial_cache_ttl_minutes,
                    &CACHE_TTL_RANGE,
                ));
            }
        }

        if let Some(props) = ini.section(Some("invalidation")) {
            let invalidation = &mut config.invalidation;
            invalidation.channel_capacity = positive(
                props,
                "invalidation",
                "channel_capacity",
                invalidation.channel_capacity,
            )?;
            invalidation.policy = value(props, "invalidation", "policy", invalidation.policy)?;
        }

        if let Some(props) = ini.section(Some("logging")) {
            let logging = &mut config.logging;
            if let Some(dir) = props.get("directory").map(str::trim).filter(|d| !d.is_empty()) {
                logging.directory = Some(expand_tilde(dir));
            }
            if let Some(name) = props.get("file_name").map(str::trim).filter(|n| !n.is_empty()) {
                logging.file_name = name.to_string();
            }
            if let Some(level) = props.get("level").map(str::trim).filter(|l| !l.is_empty()) {
                logging.level = level.to_string();
            }
        }

        Ok(config)
    }
}

// =============================================================================
// Value parsing
// =============================================================================

fn value<T>(
    props: &Properties,
    section: &'static str,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    let Some(raw) = props.get(key) else {
        return Ok(default);
    };
    raw.trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::InvalidValue {
            section,
            key,
            value: raw.to_string(),
            reason: e.to_string(),
        })
}

fn positive<T>(
    props: &Properties,
    section: &'static str,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr + PartialOrd + Default + fmt::Display,
    T::Err: fmt::Display,
{
    let parsed = value(props, section, key, default)?;
    if parsed <= T::default() {
        return Err(ConfigError::InvalidValue {
            section,
            key,
            value: parsed.to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(parsed)
}

fn scaled(
    props: &Properties,
    section: &'static str,
    key: &'static str,
    default: Duration,
    unit_secs: u64,
) -> Result<Duration, ConfigError> {
    let units = positive(props, section, key, default.as_secs() / unit_secs)?;
    Ok(Duration::from_secs(units.saturating_mul(unit_secs)))
}

fn minutes(
    props: &Properties,
    section: &'static str,
    key: &'static str,
    default: Duration,
) -> Result<Duration, ConfigError> {
    scaled(props, section, key, default, 60)
}

fn hours(
    props: &Properties,
    section: &'static str,
    key: &'static str,
    default: Duration,
) -> Result<Duration, ConfigError> {
    scaled(props, section, key, default, 60 * 60)
}

fn days(
    props: &Properties,
    section: &'static str,
    key: &'static str,
    default: Duration,
) -> Result<Duration, ConfigError> {
    scaled(props, section, key, default, 24 * 60 * 60)
}

fn out_of_range(
    section: &'static str,
    key: &'static str,
    value: u32,
    range: &std::ops::RangeInclusive<u32>,
) -> ConfigError {
    ConfigError::InvalidValue {
        section,
        key,
        value: value.to_string(),
        reason: format!("must be within {}..={}", range.start(), range.end()),
    }
}

fn expand_tilde(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| PathBuf::from(path)),
        None => PathBuf::from(path),
    }
}
