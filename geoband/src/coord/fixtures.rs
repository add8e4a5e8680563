//! Test-only helpers for placing points at exact great-circle distances.

use super::{GeoPoint, EARTH_RADIUS_METERS};

/// Point reached by travelling `meters` due north of `origin`.
pub(crate) fn offset_north(origin: GeoPoint, meters: f64) -> GeoPoint {
    let delta_lat = (meters / EARTH_RADIUS_METERS).to_degrees();
    GeoPoint::new(origin.lat + delta_lat, origin.lon)
}

/// Point reached by travelling `meters` from `origin` on the initial
/// bearing `bearing_deg` (clockwise from north).
pub(crate) fn destination(origin: GeoPoint, bearing_deg: f64, meters: f64) -> GeoPoint {
    let angular = meters / EARTH_RADIUS_METERS;
    let bearing = bearing_deg.to_radians();
    let lat1 = origin.lat.to_radians();
    let lon1 = origin.lon.to_radians();

    let lat2 = (lat1.sin() * angular.cos() + lat1.cos() * angular.sin() * bearing.cos()).asin();
    let lon2 = lon1
        + (bearing.sin() * angular.sin() * lat1.cos())
            .atan2(angular.cos() - lat1.sin() * lat2.sin());

    let lon = (lon2.to_degrees() + 540.0) % 360.0 - 180.0;
    GeoPoint::new(lat2.to_degrees(), lon)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::{haversine_distance, haversine_meters};

    #[test]
    fn test_offset_north_lands_on_exact_distance() {
        let origin = GeoPoint::new(37.5, 127.03);
        for meters in [120.0, 450.0, 900.0, 1999.0] {
            let p = offset_north(origin, meters);
            assert_eq!(haversine_meters(origin, p), meters as u32);
        }
    }

    #[test]
    fn test_destination_on_every_bearing() {
        let origin = GeoPoint::new(-33.9, 151.2);
        for bearing in (0..360).step_by(15) {
            let p = destination(origin, f64::from(bearing), 699.4);
            let d = haversine_distance(origin, p);
            assert!((d - 699.4).abs() < 1e-6, "bearing {}: {}", bearing, d);
        }
    }

    #[test]
    fn test_destination_due_north_matches_offset() {
        let origin = GeoPoint::new(37.5, 127.03);
        let a = destination(origin, 0.0, 500.0);
        let b = offset_north(origin, 500.0);
        assert!((a.lat - b.lat).abs() < 1e-9);
        assert!((a.lon - b.lon).abs() < 1e-9);
    }
}
