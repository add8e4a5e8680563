//! Fixture helpers shared by the integration tests.

use geoband::coord::EARTH_RADIUS_METERS;
use geoband::GeoPoint;

/// Point reached by travelling `meters` due north of `origin`.
pub fn offset_north(origin: GeoPoint, meters: f64) -> GeoPoint {
    let delta_lat = (meters / EARTH_RADIUS_METERS).to_degrees();
    GeoPoint::new(origin.lat + delta_lat, origin.lon)
}
