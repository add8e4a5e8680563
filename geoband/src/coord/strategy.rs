//! Radius → (resolution, k) candidate strategy.
//!
//! The table trades cell size against ring count so that the k-ring around
//! the query cell comfortably covers the search radius while keeping the
//! candidate set small.
//!
//! | radius ≤ (m) | resolution | k |
//! |--------------|------------|---|
//! | 300          | 10         | 4 |
//! | 500          | 9          | 3 |
//! | 700          | 9          | 4 |
//! | 1000         | 8          | 3 |
//! | above        | 7          | 2 |

use super::cell::{self, CellId, GridResolution};
use super::types::{CoordError, GeoPoint};

/// The cell resolution and ring count used for one radius.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchStrategy {
    pub resolution: GridResolution,
    pub k: u32,
}

impl SearchStrategy {
    /// Select the strategy for a search radius in meters.
    pub fn for_radius(radius_m: u32) -> Self {
        let (resolution, k) = match radius_m {
            0..=300 => (GridResolution::Res10, 4),
            301..=500 => (GridResolution::Res9, 3),
            501..=700 => (GridResolution::Res9, 4),
            701..=1000 => (GridResolution::Res8, 3),
            _ => (GridResolution::Res7, 2),
        };
        Self { resolution, k }
    }

    /// Candidate cells around `center` for this strategy.
    pub fn candidate_cells(&self, center: GeoPoint) -> Result<Vec<CellId>, CoordError> {
        let origin = cell::encode(center, self.resolution)?;
        cell::ring(origin, self.k)
    }
}
