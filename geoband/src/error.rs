//! Domain error type for search operations.

use thiserror::Error;

use crate::coord::{CoordError, InvalidBand};
use crate::model::PoiId;
use crate::repository::RepositoryError;

/// Errors returned by the resolvers and the search service.
#[derive(Debug, Error)]
pub enum GeoError {
    /// The POI id is unknown.
    #[error("POI not found: {0}")]
    PoiNotFound(PoiId),

    /// No POI lies within the widest band of the query point.
    #[error("No POI within 2000 m of ({lat}, {lon})")]
    NoPoiNearby { lat: f64, lon: f64 },

    /// The requested radius is not a supported band.
    #[error(transparent)]
    InvalidBand(#[from] InvalidBand),

    /// Invalid coordinate, resolution or cell.
    #[error(transparent)]
    InvalidCoordinate(#[from] CoordError),

    /// The candidate repository failed.
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

impl GeoError {
    /// True for the NotFound class of errors.
    pub fn is_not_found(&self) -> bool {
        matches!(self, GeoError::PoiNotFound(_) | GeoError::NoPoiNearby { .. })
    }

    /// True for the InvalidArgument class of errors.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(
            self,
            GeoError::InvalidBand(_) | GeoError::InvalidCoordinate(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(GeoError::PoiNotFound(PoiId(7)).is_not_found());
        assert!(GeoError::NoPoiNearby { lat: 0.0, lon: 0.0 }.is_not_found());
        assert!(GeoError::from(InvalidBand(850)).is_invalid_argument());
        assert!(GeoError::from(CoordError::UnsupportedResolution(5)).is_invalid_argument());

        let repo = GeoError::from(RepositoryError::Unavailable("down".into()));
        assert!(!repo.is_not_found());
        assert!(!repo.is_invalid_argument());
    }

    #[test]
    fn test_display() {
        let err = GeoError::PoiNotFound(PoiId(42));
        assert_eq!(err.to_string(), "POI not found: 42");

        let err = GeoError::from(InvalidBand(850));
        assert!(err.to_string().contains("850"));
    }
}
