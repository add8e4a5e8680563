//! Process-wide tunable thresholds.
//!
//! `ThresholdState` holds the two values the adaptive controller tunes:
//!
//! - `hotspot_threshold`: hourly access count at which a POI is promoted to
//!   hotspot, bounded to [50, 200]
//! - `cache_ttl_minutes`: TTL applied to distributed cache entries, bounded
//!   to [5, 60]
//!
//! # Thread Safety
//!
//! Single writer (the controller), many readers. Readers go through the
//! [`ThresholdReader`] trait and see plain atomic loads. Mutation is
//! crate-private.
//!
//! ```
//! use geoband::threshold::{ThresholdReader, ThresholdState};
//! use std::sync::Arc;
//!
//! let state = Arc::new(ThresholdState::default());
//! let reader: Arc<dyn ThresholdReader> = state.clone();
//! assert_eq!(reader.hotspot_threshold(), 100);
//! assert_eq!(reader.cache_ttl_minutes(), 30);
//! ```

use std::ops::RangeInclusive;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

/// Default hourly access count for hotspot promotion.
pub const DEFAULT_HOTSPOT_THRESHOLD: u32 = 100;

/// Default distributed cache TTL in minutes.
pub const DEFAULT_CACHE_TTL_MINUTES: u32 = 30;

/// Allowed range for the hotspot threshold.
pub const HOTSPOT_THRESHOLD_RANGE: RangeInclusive<u32> = 50..=200;

/// Allowed range for the cache TTL in minutes.
pub const CACHE_TTL_RANGE: RangeInclusive<u32> = 5..=60;

/// Read-only view of the current thresholds.
pub trait ThresholdReader: Send + Sync {
    /// Hourly access count at which a POI becomes a hotspot.
    fn hotspot_threshold(&self) -> u32;

    /// Current distributed cache TTL in minutes.
    fn cache_ttl_minutes(&self) -> u32;

    /// Current distributed cache TTL as a duration.
    fn cache_ttl(&self) -> Duration {
        Duration::from_secs(u64::from(self.cache_ttl_minutes()) * 60)
    }
}

/// A change applied to one threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Adjustment {
    pub from: u32,
    pub to: u32,
}

impl Adjustment {
    /// True when the bound prevented any change.
    pub fn is_noop(&self) -> bool {
        self.from == self.to
    }
}

/// Atomic threshold storage.
#[derive(Debug)]
pub struct ThresholdState {
    hotspot_threshold: AtomicU32,
    cache_ttl_minutes: AtomicU32,
}

impl Default for ThresholdState {
    fn default() -> Self {
        Self::new(DEFAULT_HOTSPOT_THRESHOLD, DEFAULT_CACHE_TTL_MINUTES)
    }
}

impl ThresholdState {
    /// Create a state with initial values, clamped into their ranges.
    pub fn new(hotspot_threshold: u32, cache_ttl_minutes: u32) -> Self {
        Self {
            hotspot_threshold: AtomicU32::new(clamp(hotspot_threshold, &HOTSPOT_THRESHOLD_RANGE)),
            cache_ttl_minutes: AtomicU32::new(clamp(cache_ttl_minutes, &CACHE_TTL_RANGE)),
        }
    }

    pub(crate) fn adjust_hotspot_threshold(&self, delta: i32) -> Adjustment {
        adjust(&self.hotspot_threshold, delta, &HOTSPOT_THRESHOLD_RANGE)
    }

    pub(crate) fn adjust_cache_ttl_minutes(&self, delta: i32) -> Adjustment {
        adjust(&self.cache_ttl_minutes, delta, &CACHE_TTL_RANGE)
    }
}

impl ThresholdReader for ThresholdState {
    fn hotspot_threshold(&self) -> u32 {
        self.hotspot_threshold.load(Ordering::Relaxed)
    }

    fn cache_ttl_minutes(&self) -> u32 {
        self.cache_ttl_minutes.load(Ordering::Relaxed)
    }
}

fn clamp(value: u32, range: &RangeInclusive<u32>) -> u32 {
    value.clamp(*range.start(), *range.end())
}

fn adjust(cell: &AtomicU32, delta: i32, range: &RangeInclusive<u32>) -> Adjustment {
    let from = cell.load(Ordering::Relaxed);
    let to = clamp(from.saturating_add_signed(delta), range);
    cell.store(to, Ordering::Relaxed);
    Adjustment { from, to }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let state = ThresholdState::default();
        assert_eq!(state.hotspot_threshold(), 100);
        assert_eq!(state.cache_ttl_minutes(), 30);
        assert_eq!(state.cache_ttl(), Duration::from_secs(1800));
    }

    #[test]
    fn test_new_clamps_initial_values() {
        let state = ThresholdState::new(10, 500);
        assert_eq!(state.hotspot_threshold(), 50);
        assert_eq!(state.cache_ttl_minutes(), 60);
    }

    #[test]
    fn test_adjust_within_bounds() {
        let state = ThresholdState::default();
        let adj = state.adjust_hotspot_threshold(-10);
        assert_eq!(adj, Adjustment { from: 100, to: 90 });
        assert_eq!(state.hotspot_threshold(), 90);

        let adj = state.adjust_cache_ttl_minutes(5);
        assert_eq!(adj, Adjustment { from: 30, to: 35 });
    }

    #[test]
    fn test_adjust_saturates_at_floor_and_cap() {
        let state = ThresholdState::new(55, 58);
        assert_eq!(state.adjust_hotspot_threshold(-10).to, 50);
        assert!(state.adjust_hotspot_threshold(-10).is_noop());

        assert_eq!(state.adjust_cache_ttl_minutes(5).to, 60);
        assert!(state.adjust_cache_ttl_minutes(5).is_noop());
    }

    #[test]
    fn test_repeated_adjustments_stay_in_range() {
        let state = ThresholdState::default();
        for _ in 0..50 {
            state.adjust_hotspot_threshold(10);
            state.adjust_cache_ttl_minutes(-5);
        }
        assert_eq!(state.hotspot_threshold(), 200);
        assert_eq!(state.cache_ttl_minutes(), 5);
    }
}
