//! geoband - POI proximity search with a hotspot-aware two-tier cache
//!
//! The library answers two questions over H3-indexed points of interest
//! and stores:
//!
//! - which POI is nearest a coordinate
//! - which stores lie within a distance band of a POI
//!
//! Nearby-store results are cached in a local moka tier backed by a
//! distributed sorted-set tier. Store writes invalidate affected POIs;
//! frequently accessed POIs (hotspots) keep serving flagged-stale data
//! while a background refresh runs. A periodic controller tunes the hotspot
//! threshold and cache TTL from system load and cache hit rates.
//!
//! # Modules
//!
//! | Module          | Role                                              |
//! |-----------------|---------------------------------------------------|
//! | `coord`         | H3 cells, distance bands, haversine distance      |
//! | `model`         | POI, store and result row types                   |
//! | `repository`    | Candidate lookup by cell                          |
//! | `resolver`      | Nearest-POI and nearby-store computation          |
//! | `cache`         | Tiers, staleness metadata, cache metrics          |
//! | `hotspot`       | Access counting and hotspot flags                 |
//! | `threshold`     | Tunable thresholds shared across components       |
//! | `controller`    | Adaptive threshold control loop                   |
//! | `invalidation`  | Store-write invalidation policies and worker      |
//! | `service`       | Consumer-facing search facade                     |
//! | `app`           | Bootstrap and lifecycle                           |

pub mod app;
pub mod cache;
pub mod clock;
pub mod config;
pub mod controller;
pub mod coord;
pub mod error;
pub mod hotspot;
pub mod invalidation;
pub mod logging;
pub mod model;
pub mod repository;
pub mod resolver;
pub mod service;
pub mod threshold;

pub use app::{AppConfig, AppError, GeoBandApp};
pub use coord::{DistanceBand, GeoPoint};
pub use error::GeoError;
pub use model::{Poi, PoiId, Store, StoreDistance, StoreId, StoreInfo};
pub use service::SpatialSearchService;
