//! Two-tier result cache.
//!
//! Nearby-store results are cached per (POI, band):
//!
//! - [`LocalTier`]: a tiny moka cache inside the process
//! - [`DistributedTier`]: sorted sets in a [`DistributedStore`]
//! - [`MultiTierCache`]: reads Tier 1 then Tier 2, writes through both
//!
//! Alongside the results live per-entry freshness records
//! ([`StalenessTracker`]) and hit/miss counters ([`CacheMetrics`]).

pub mod distributed;
pub mod local;
pub mod metadata;
pub mod metrics;
mod orchestrator;
mod store;
mod traits;

pub use distributed::{result_key, DistributedTier};
pub use local::{CacheKey, LocalTier, LocalTierStats};
pub use metadata::{metadata_key, CacheMetadata, StalenessTracker, REASON_NEW_STORE};
pub use metrics::{metrics_key, CacheMetrics, CacheMetricsSnapshot};
pub use orchestrator::{CacheLookup, CacheTier, MultiTierCache};
pub use store::MemoryStore;
pub use traits::{BoxFuture, DistributedStore, StoreError};
