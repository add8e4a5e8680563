//! Write-triggered cache invalidation.
//!
//! When a store is written, cached results for POIs within 2000 m of it may
//! be missing the new store. Each affected POI is either evicted or, if it
//! is a hotspot, kept but flagged stale so it keeps serving while a refresh
//! catches up.
//!
//! - [`InvalidationPolicy`]: per-POI decision ([`AlwaysDelete`], [`HotspotAware`])
//! - [`InvalidationHandler`]: finds affected POIs and applies the policy
//! - [`InvalidationWorker`] / [`InvalidationHandle`]: the channel between the
//!   write path and the handler

mod handler;
mod policy;
mod worker;

pub use handler::{InvalidationHandler, InvalidationOutcome, InvalidationTask};
pub use policy::{AlwaysDelete, HotspotAware, InvalidationAction, InvalidationPolicy};
pub use worker::{InvalidationHandle, InvalidationWorker, DEFAULT_INVALIDATION_CHANNEL_CAPACITY};
