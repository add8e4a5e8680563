//! Domain records: POIs, stores and resolver output rows.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::coord::{CellIndexes, CoordError, GeoPoint};

/// Identifier of a point of interest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PoiId(pub u64);

impl fmt::Display for PoiId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoreId(pub u64);

impl fmt::Display for StoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A point of interest with its precomputed spatial cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Poi {
    pub id: PoiId,
    pub name: String,
    pub category: String,
    pub location: GeoPoint,
    pub cells: CellIndexes,
}

impl Poi {
    /// Build a POI, computing its cells from the location.
    pub fn new(
        id: PoiId,
        name: impl Into<String>,
        category: impl Into<String>,
        location: GeoPoint,
    ) -> Result<Self, CoordError> {
        Ok(Self {
            id,
            name: name.into(),
            category: category.into(),
            location,
            cells: CellIndexes::for_point(location)?,
        })
    }
}

/// A store with its precomputed spatial cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Store {
    pub id: StoreId,
    pub name: String,
    pub location: GeoPoint,
    pub cells: CellIndexes,
}

impl Store {
    /// Build a store, computing its cells from the location.
    pub fn new(
        id: StoreId,
        name: impl Into<String>,
        location: GeoPoint,
    ) -> Result<Self, CoordError> {
        Ok(Self {
            id,
            name: name.into(),
            location,
            cells: CellIndexes::for_point(location)?,
        })
    }
}

/// One row of a nearby-store result: a store and its distance from the POI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StoreDistance {
    pub store_id: StoreId,
    pub distance_m: u32,
}

impl StoreDistance {
    pub fn new(store_id: StoreId, distance_m: u32) -> Self {
        Self {
            store_id,
            distance_m,
        }
    }
}

/// Sort rows ascending by distance, ties by store id.
pub fn sort_by_distance(rows: &mut [StoreDistance]) {
    rows.sort_unstable_by_key(|row| (row.distance_m, row.store_id));
}

/// A nearby-store row joined with the store's details.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreInfo {
    pub store_id: StoreId,
    pub name: String,
    pub location: GeoPoint,
    pub distance_m: u32,
}
