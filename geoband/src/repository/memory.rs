//! In-memory candidate repository.

use std::collections::{BTreeSet, HashMap};

use parking_lot::RwLock;

use super::{CandidateRepository, RepositoryError};
use crate::cache::BoxFuture;
use crate::coord::{CellId, GridResolution};
use crate::model::{Poi, PoiId, Store, StoreId};

type CellKey = (GridResolution, CellId);

#[derive(Default)]
struct Inner {
    pois: HashMap<PoiId, Poi>,
    stores: HashMap<StoreId, Store>,
    poi_cells: HashMap<CellKey, BTreeSet<PoiId>>,
    store_cells: HashMap<CellKey, BTreeSet<StoreId>>,
}

/// POIs and stores held in hash maps, indexed by every resolution's cell.
#[derive(Default)]
pub struct InMemoryRepository {
    inner: RwLock<Inner>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a repository pre-populated with records.
    pub fn with_records(
        pois: impl IntoIterator<Item = Poi>,
        stores: impl IntoIterator<Item = Store>,
    ) -> Self {
        let repo = Self::new();
        for poi in pois {
            repo.insert_poi(poi);
        }
        for store in stores {
            repo.insert_store(store);
        }
        repo
    }

    /// Insert or replace a POI.
    pub fn insert_poi(&self, poi: Poi) {
        let mut inner = self.inner.write();
        if let Some(old) = inner.pois.remove(&poi.id) {
            for res in GridResolution::ALL {
                if let Some(ids) = inner.poi_cells.get_mut(&(res, old.cells.at(res))) {
                    ids.remove(&old.id);
                }
            }
        }
        for res in GridResolution::ALL {
            inner
                .poi_cells
                .entry((res, poi.cells.at(res)))
                .or_default()
                .insert(poi.id);
        }
        inner.pois.insert(poi.id, poi);
    }

    /// Insert or replace a store.
    pub fn insert_store(&self, store: Store) {
        let mut inner = self.inner.write();
        if let Some(old) = inner.stores.remove(&store.id) {
            for res in GridResolution::ALL {
                if let Some(ids) = inner.store_cells.get_mut(&(res, old.cells.at(res))) {
                    ids.remove(&old.id);
                }
            }
        }
        for res in GridResolution::ALL {
            inner
                .store_cells
                .entry((res, store.cells.at(res)))
                .or_default()
                .insert(store.id);
        }
        inner.stores.insert(store.id, store);
    }

    pub fn poi_count(&self) -> usize {
        self.inner.read().pois.len()
    }

    pub fn store_count(&self) -> usize {
        self.inner.read().stores.len()
    }

    fn collect_pois(&self, resolution: GridResolution, cells: &[CellId]) -> Vec<Poi> {
        let inner = self.inner.read();
        cells
            .iter()
            .filter_map(|cell| inner.poi_cells.get(&(resolution, *cell)))
            .flatten()
            .filter_map(|id| inner.pois.get(id).cloned())
            .collect()
    }

    fn collect_stores(&self, resolution: GridResolution, cells: &[CellId]) -> Vec<Store> {
        let inner = self.inner.read();
        cells
            .iter()
            .filter_map(|cell| inner.store_cells.get(&(resolution, *cell)))
            .flatten()
            .filter_map(|id| inner.stores.get(id).cloned())
            .collect()
    }
}

impl CandidateRepository for InMemoryRepository {
    fn pois_in_cells<'a>(
        &'a self,
        resolution: GridResolution,
        cells: &'a [CellId],
    ) -> BoxFuture<'a, Result<Vec<Poi>, RepositoryError>> {
        Box::pin(async move { Ok(self.collect_pois(resolution, cells)) })
    }

    fn stores_in_cells<'a>(
        &'a self,
        resolution: GridResolution,
        cells: &'a [CellId],
    ) -> BoxFuture<'a, Result<Vec<Store>, RepositoryError>> {
        Box::pin(async move { Ok(self.collect_stores(resolution, cells)) })
    }

    fn poi(&self, id: PoiId) -> BoxFuture<'_, Result<Option<Poi>, RepositoryError>> {
        Box::pin(async move { Ok(self.inner.read().pois.get(&id).cloned()) })
    }

    fn stores_by_ids<'a>(
        &'a self,
        ids: &'a [StoreId],
    ) -> BoxFuture<'a, Result<Vec<Store>, RepositoryError>> {
        Box::pin(async move {
            let inner = self.inner.read();
            Ok(ids
                .iter()
                .filter_map(|id| inner.stores.get(id).cloned())
                .collect())
        })
    }
}
