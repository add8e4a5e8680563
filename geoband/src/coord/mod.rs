//! Geographic coordinate module
//!
//! Provides the spatial primitives the resolvers are built on:
//!
//! - [`GeoPoint`]: a validated latitude/longitude pair
//! - [`cell`]: hierarchical H3 cell encoding and k-ring expansion
//! - [`SearchStrategy`]: the radius → (resolution, k) lookup table
//! - [`DistanceBand`]: the fixed set of supported search radii
//! - [`haversine_meters`]: great-circle distance in whole meters

pub mod cell;
mod band;
#[cfg(test)]
pub(crate) mod fixtures;
mod strategy;
mod types;

pub use band::{DistanceBand, InvalidBand};
pub use cell::{CellId, CellIndexes, GridResolution, SpatialCell};
pub use strategy::SearchStrategy;
pub use types::{CoordError, GeoPoint, MAX_LAT, MAX_LON, MIN_LAT, MIN_LON};

/// Mean earth radius used for all distance calculations.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Great-circle distance between two points in meters.
#[inline]
pub fn haversine_distance(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let delta_lat = (b.lat - a.lat).to_radians();
    let delta_lon = (b.lon - a.lon).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_METERS * c
}

/// Great-circle distance rounded to whole meters.
///
/// Rounds half away from zero. Every distance that is compared against a
/// band or stored as a cache score goes through this function.
///
/// # Arguments
///
/// * `a` - First point
/// * `b` - Second point
#[inline]
pub fn haversine_meters(a: GeoPoint, b: GeoPoint) -> u32 {
    haversine_distance(a, b).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_distance() {
        let p = GeoPoint::new(37.5, 127.03);
        assert_eq!(haversine_meters(p, p), 0);
    }

    #[test]
    fn test_known_distance_seoul_busan() {
        // Seoul City Hall to Busan City Hall is roughly 325 km.
        let seoul = GeoPoint::new(37.5663, 126.9779);
        let busan = GeoPoint::new(35.1796, 129.0756);
        let d = haversine_meters(seoul, busan);
        assert!((320_000..330_000).contains(&d), "got {}", d);
    }

    #[test]
    fn test_one_degree_of_latitude() {
        let a = GeoPoint::new(0.0, 0.0);
        let b = GeoPoint::new(1.0, 0.0);
        // 2πR / 360
        assert_eq!(haversine_meters(a, b), 111_195);
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_symmetry_property(
                lat1 in -89.0..89.0_f64,
                lon1 in -179.0..179.0_f64,
                lat2 in -89.0..89.0_f64,
                lon2 in -179.0..179.0_f64
            ) {
                let a = GeoPoint::new(lat1, lon1);
                let b = GeoPoint::new(lat2, lon2);
                prop_assert_eq!(haversine_meters(a, b), haversine_meters(b, a));
            }

            #[test]
            fn test_bounded_by_half_circumference(
                lat1 in -90.0..=90.0_f64,
                lon1 in -180.0..=180.0_f64,
                lat2 in -90.0..=90.0_f64,
                lon2 in -180.0..=180.0_f64
            ) {
                let d = haversine_distance(GeoPoint::new(lat1, lon1), GeoPoint::new(lat2, lon2));
                prop_assert!(d >= 0.0);
                prop_assert!(d <= std::f64::consts::PI * EARTH_RADIUS_METERS + 1.0);
            }
        }
    }
}
