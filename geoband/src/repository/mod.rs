//! Candidate repository interface.
//!
//! The persistent store is an external collaborator. The resolvers only need
//! to ask it one kind of question: "which records have a precomputed cell at
//! resolution R inside this set of cells?" Exact distance filtering happens
//! in the resolver, so implementations may return false positives but never
//! false negatives.
//!
//! [`InMemoryRepository`] is the bundled implementation, used by the CLI
//! and by tests.

mod memory;

pub use memory::InMemoryRepository;

use thiserror::Error;

use crate::cache::BoxFuture;
use crate::coord::{CellId, GridResolution};
use crate::model::{Poi, PoiId, Store, StoreId};

/// Errors surfaced by a candidate repository.
#[derive(Debug, Clone, Error)]
pub enum RepositoryError {
    /// The backing store could not be reached.
    #[error("Repository unavailable: {0}")]
    Unavailable(String),

    /// The backing store returned malformed data.
    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

/// Read access to POIs and stores by spatial cell.
///
/// # Dyn Compatibility
///
/// Async methods return [`BoxFuture`] so the repository can be shared as
/// `Arc<dyn CandidateRepository>`.
pub trait CandidateRepository: Send + Sync {
    /// POIs whose cell at `resolution` is one of `cells`.
    fn pois_in_cells<'a>(
        &'a self,
        resolution: GridResolution,
        cells: &'a [CellId],
    ) -> BoxFuture<'a, Result<Vec<Poi>, RepositoryError>>;

    /// Stores whose cell at `resolution` is one of `cells`.
    fn stores_in_cells<'a>(
        &'a self,
        resolution: GridResolution,
        cells: &'a [CellId],
    ) -> BoxFuture<'a, Result<Vec<Store>, RepositoryError>>;

    /// Look up a single POI.
    fn poi(&self, id: PoiId) -> BoxFuture<'_, Result<Option<Poi>, RepositoryError>>;

    /// Look up stores by id. Unknown ids are skipped.
    fn stores_by_ids<'a>(
        &'a self,
        ids: &'a [StoreId],
    ) -> BoxFuture<'a, Result<Vec<Store>, RepositoryError>>;
}
