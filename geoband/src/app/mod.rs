//! Application bootstrap and lifecycle management.
//!
//! `GeoBandApp` wires the search service to its background tasks and owns
//! their shutdown.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                           GeoBandApp                             │
//! │                                                                  │
//! │  SpatialSearchService ──► MultiTierCache ──► LocalTier (moka)    │
//! │        │                        └──────────► DistributedTier     │
//! │        │                                                         │
//! │        └─ InvalidationHandle ──► InvalidationWorker  (task)      │
//! │                                                                  │
//! │  AdaptiveThresholdController ──► ThresholdState       (task)     │
//! │  metrics persister ──► cache:metrics:{hour}           (task)     │
//! │  AccessTracker ──► demote / promote, reset counters   (task)     │
//! │                                                                  │
//! │  all tasks stop on one CancellationToken                         │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use geoband::app::{AppConfig, GeoBandApp};
//!
//! let app = GeoBandApp::start(config, repository, store, metrics_source)?;
//! let stores = app.service().get_nearby_stores(poi_id, 500).await?;
//! app.shutdown().await;
//! ```

mod bootstrap;
mod config;
mod error;

pub use bootstrap::GeoBandApp;
pub use config::{AppConfig, DEFAULT_METRICS_PERSIST_INTERVAL};
pub use error::AppError;
