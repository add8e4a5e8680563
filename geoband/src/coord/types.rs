//! Core coordinate types.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Minimum valid latitude in degrees.
pub const MIN_LAT: f64 = -90.0;

/// Maximum valid latitude in degrees.
pub const MAX_LAT: f64 = 90.0;

/// Minimum valid longitude in degrees.
pub const MIN_LON: f64 = -180.0;

/// Maximum valid longitude in degrees.
pub const MAX_LON: f64 = 180.0;

/// A WGS84 coordinate pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in degrees (-90.0 to 90.0)
    pub lat: f64,
    /// Longitude in degrees (-180.0 to 180.0)
    pub lon: f64,
}

impl GeoPoint {
    /// Create a new point without validation.
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Create a point, rejecting non-finite or out-of-range values.
    pub fn try_new(lat: f64, lon: f64) -> Result<Self, CoordError> {
        let point = Self { lat, lon };
        point.validate()?;
        Ok(point)
    }

    /// Check that both components are finite and in range.
    pub fn validate(&self) -> Result<(), CoordError> {
        if !self.lat.is_finite() || !(MIN_LAT..=MAX_LAT).contains(&self.lat) {
            return Err(CoordError::InvalidLatitude(self.lat));
        }
        if !self.lon.is_finite() || !(MIN_LON..=MAX_LON).contains(&self.lon) {
            return Err(CoordError::InvalidLongitude(self.lon));
        }
        Ok(())
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6})", self.lat, self.lon)
    }
}

/// Errors produced by coordinate and cell operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordError {
    #[error("Invalid latitude: {0} (expected -90.0..=90.0)")]
    InvalidLatitude(f64),

    #[error("Invalid longitude: {0} (expected -180.0..=180.0)")]
    InvalidLongitude(f64),

    #[error("Unsupported spatial resolution: {0} (supported: 7, 8, 9, 10)")]
    UnsupportedResolution(u8),

    #[error("Invalid cell index: {0:#x}")]
    InvalidCell(u64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_new_accepts_valid_point() {
        let point = GeoPoint::try_new(37.5, 127.03).unwrap();
        assert_eq!(point.lat, 37.5);
        assert_eq!(point.lon, 127.03);
    }

    #[test]
    fn test_try_new_rejects_out_of_range() {
        assert!(matches!(
            GeoPoint::try_new(91.0, 0.0),
            Err(CoordError::InvalidLatitude(_))
        ));
        assert!(matches!(
            GeoPoint::try_new(0.0, -180.5),
            Err(CoordError::InvalidLongitude(_))
        ));
    }

    #[test]
    fn test_try_new_rejects_nan() {
        assert!(GeoPoint::try_new(f64::NAN, 0.0).is_err());
        assert!(GeoPoint::try_new(0.0, f64::INFINITY).is_err());
    }

    #[test]
    fn test_display() {
        let point = GeoPoint::new(37.5, 127.03);
        assert_eq!(point.to_string(), "(37.500000, 127.030000)");
    }
}
