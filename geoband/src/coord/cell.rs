//! Hierarchical spatial cell codec.
//!
//! Points are bucketed into H3 hexagonal cells at one of four resolutions.
//! Every POI and store carries its precomputed cell at each resolution, so a
//! candidate lookup becomes an exact-match "cell in set" query instead of a
//! range scan.
//!
//! # Resolutions
//!
//! | Resolution | Avg edge length |
//! |------------|-----------------|
//! | 7          | ≈1406 m         |
//! | 8          | ≈531 m          |
//! | 9          | ≈201 m          |
//! | 10         | ≈76 m           |

use std::fmt;

use h3o::{CellIndex, LatLng, Resolution};
use serde::{Deserialize, Serialize};

use super::types::{CoordError, GeoPoint};

/// A spatial grid resolution supported by the candidate index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GridResolution {
    /// H3 resolution 7 (≈1406 m edge).
    Res7,
    /// H3 resolution 8 (≈531 m edge).
    Res8,
    /// H3 resolution 9 (≈201 m edge).
    Res9,
    /// H3 resolution 10 (≈76 m edge).
    Res10,
}

impl GridResolution {
    /// All supported resolutions, coarse to fine.
    pub const ALL: [GridResolution; 4] = [
        GridResolution::Res7,
        GridResolution::Res8,
        GridResolution::Res9,
        GridResolution::Res10,
    ];

    /// The numeric H3 resolution level.
    pub fn level(self) -> u8 {
        match self {
            GridResolution::Res7 => 7,
            GridResolution::Res8 => 8,
            GridResolution::Res9 => 9,
            GridResolution::Res10 => 10,
        }
    }

    /// Approximate cell edge length in meters.
    ///
    /// These are the figures the search strategy table is sized against.
    pub fn edge_length_m(self) -> f64 {
        match self {
            GridResolution::Res7 => 1406.0,
            GridResolution::Res8 => 531.0,
            GridResolution::Res9 => 201.0,
            GridResolution::Res10 => 76.0,
        }
    }

    fn to_h3(self) -> Resolution {
        match self {
            GridResolution::Res7 => Resolution::Seven,
            GridResolution::Res8 => Resolution::Eight,
            GridResolution::Res9 => Resolution::Nine,
            GridResolution::Res10 => Resolution::Ten,
        }
    }
}

impl TryFrom<u8> for GridResolution {
    type Error = CoordError;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        match level {
            7 => Ok(GridResolution::Res7),
            8 => Ok(GridResolution::Res8),
            9 => Ok(GridResolution::Res9),
            10 => Ok(GridResolution::Res10),
            other => Err(CoordError::UnsupportedResolution(other)),
        }
    }
}

impl fmt::Display for GridResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "res{}", self.level())
    }
}

/// A 64-bit spatial cell identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellId(pub u64);

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:x}", self.0)
    }
}

/// A cell id tagged with its resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpatialCell {
    pub resolution: GridResolution,
    pub id: CellId,
}

/// Encode a point into the cell containing it at `resolution`.
///
/// Deterministic: the same point and resolution always yield the same cell.
pub fn encode(point: GeoPoint, resolution: GridResolution) -> Result<CellId, CoordError> {
    point.validate()?;
    let latlng = LatLng::new(point.lat, point.lon)
        .map_err(|_| CoordError::InvalidLatitude(point.lat))?;
    Ok(CellId(u64::from(latlng.to_cell(resolution.to_h3()))))
}

/// All cells within `k` rings of `center`, center included.
///
/// The result is sorted and free of duplicates.
pub fn ring(center: CellId, k: u32) -> Result<Vec<CellId>, CoordError> {
    let index = CellIndex::try_from(center.0).map_err(|_| CoordError::InvalidCell(center.0))?;
    let disk: Vec<CellIndex> = index.grid_disk(k);

    let mut cells: Vec<CellId> = disk.into_iter().map(|c| CellId(u64::from(c))).collect();
    cells.sort_unstable();
    cells.dedup();
    Ok(cells)
}

/// Resolution of an encoded cell id.
pub fn resolution_of(cell: CellId) -> Result<GridResolution, CoordError> {
    let index = CellIndex::try_from(cell.0).map_err(|_| CoordError::InvalidCell(cell.0))?;
    GridResolution::try_from(u8::from(index.resolution()))
}

/// The four precomputed cells carried by every indexed record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellIndexes {
    pub res7: CellId,
    pub res8: CellId,
    pub res9: CellId,
    pub res10: CellId,
}

impl CellIndexes {
    /// Compute all four cells for a point.
    pub fn for_point(point: GeoPoint) -> Result<Self, CoordError> {
        Ok(Self {
            res7: encode(point, GridResolution::Res7)?,
            res8: encode(point, GridResolution::Res8)?,
            res9: encode(point, GridResolution::Res9)?,
            res10: encode(point, GridResolution::Res10)?,
        })
    }

    /// The cell at a given resolution.
    pub fn at(&self, resolution: GridResolution) -> CellId {
        match resolution {
            GridResolution::Res7 => self.res7,
            GridResolution::Res8 => self.res8,
            GridResolution::Res9 => self.res9,
            GridResolution::Res10 => self.res10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GANGNAM: GeoPoint = GeoPoint::new(37.5, 127.03);

    #[test]
    fn test_resolution_try_from() {
        assert_eq!(GridResolution::try_from(7).unwrap(), GridResolution::Res7);
        assert_eq!(GridResolution::try_from(10).unwrap(), GridResolution::Res10);
        assert_eq!(
            GridResolution::try_from(6),
            Err(CoordError::UnsupportedResolution(6))
        );
        assert_eq!(
            GridResolution::try_from(11),
            Err(CoordError::UnsupportedResolution(11))
        );
    }

    #[test]
    fn test_edge_lengths_shrink_with_resolution() {
        let edges: Vec<f64> = GridResolution::ALL
            .iter()
            .map(|r| r.edge_length_m())
            .collect();
        assert_eq!(edges, vec![1406.0, 531.0, 201.0, 76.0]);
    }

    #[test]
    fn test_encode_is_deterministic() {
        for res in GridResolution::ALL {
            let a = encode(GANGNAM, res).unwrap();
            let b = encode(GANGNAM, res).unwrap();
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_encode_is_resolution_specific() {
        let cells: Vec<CellId> = GridResolution::ALL
            .iter()
            .map(|r| encode(GANGNAM, *r).unwrap())
            .collect();
        for (i, a) in cells.iter().enumerate() {
            for b in cells.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_encoded_cell_reports_its_resolution() {
        for res in GridResolution::ALL {
            let cell = encode(GANGNAM, res).unwrap();
            assert_eq!(resolution_of(cell).unwrap(), res);
        }
    }

    #[test]
    fn test_encode_rejects_invalid_point() {
        let result = encode(GeoPoint::new(120.0, 0.0), GridResolution::Res9);
        assert!(matches!(result, Err(CoordError::InvalidLatitude(_))));
    }

    #[test]
    fn test_ring_zero_is_center_only() {
        let center = encode(GANGNAM, GridResolution::Res9).unwrap();
        assert_eq!(ring(center, 0).unwrap(), vec![center]);
    }

    #[test]
    fn test_ring_sizes_follow_hexagonal_growth() {
        // A k-ring of hexagons holds 3k(k+1) + 1 cells away from pentagons.
        let center = encode(GANGNAM, GridResolution::Res10).unwrap();
        for k in 0..=4u32 {
            let cells = ring(center, k).unwrap();
            assert_eq!(cells.len() as u32, 3 * k * (k + 1) + 1, "k = {}", k);
            assert!(cells.contains(&center));
        }
    }

    #[test]
    fn test_ring_rejects_garbage_cell() {
        assert!(matches!(ring(CellId(0), 1), Err(CoordError::InvalidCell(0))));
    }

    #[test]
    fn test_cell_indexes_match_encode() {
        let cells = CellIndexes::for_point(GANGNAM).unwrap();
        for res in GridResolution::ALL {
            assert_eq!(cells.at(res), encode(GANGNAM, res).unwrap());
        }
    }
}
