//! JSON dataset of POIs and stores.
//!
//! ```json
//! {
//!   "pois":   [{ "id": 1, "name": "Gangnam Station", "category": "transit", "lat": 37.4979, "lon": 127.0276 }],
//!   "stores": [{ "id": 10, "name": "Cafe", "lat": 37.4985, "lon": 127.0281 }]
//! }
//! ```

use std::path::Path;

use geoband::repository::InMemoryRepository;
use geoband::{GeoPoint, Poi, PoiId, Store, StoreId};
use serde::{Deserialize, Serialize};

use crate::error::CliError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoiRecord {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub category: String,
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreRecord {
    pub id: u64,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

impl StoreRecord {
    pub fn to_store(&self) -> Result<Store, CliError> {
        Store::new(StoreId(self.id), self.name.clone(), GeoPoint::new(self.lat, self.lon))
            .map_err(|e| CliError::Dataset(format!("store {}: {}", self.id, e)))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub pois: Vec<PoiRecord>,
    #[serde(default)]
    pub stores: Vec<StoreRecord>,
}

impl Dataset {
    pub fn load(path: &Path) -> Result<Self, CliError> {
        let text = std::fs::read_to_string(path).map_err(|source| CliError::DatasetIo {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|e| CliError::Dataset(e.to_string()))
    }

    pub fn save(&self, path: &Path) -> Result<(), CliError> {
        let text =
            serde_json::to_string_pretty(self).map_err(|e| CliError::Dataset(e.to_string()))?;
        std::fs::write(path, text).map_err(|source| CliError::DatasetIo {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Next unused store id.
    pub fn next_store_id(&self) -> u64 {
        self.stores.iter().map(|s| s.id).max().map_or(1, |max| max + 1)
    }

    /// Index every record. Invalid coordinates reject the whole dataset.
    pub fn to_repository(&self) -> Result<InMemoryRepository, CliError> {
        let pois = self
            .pois
            .iter()
            .map(|p| {
                Poi::new(
                    PoiId(p.id),
                    p.name.clone(),
                    p.category.clone(),
                    GeoPoint::new(p.lat, p.lon),
                )
                .map_err(|e| CliError::Dataset(format!("poi {}: {}", p.id, e)))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let stores = self
            .stores
            .iter()
            .map(StoreRecord::to_store)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(InMemoryRepository::with_records(pois, stores))
    }
}
