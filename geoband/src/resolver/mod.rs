//! Nearest-POI and nearby-store resolvers.
//!
//! Both resolvers follow the same two-phase shape:
//!
//! ```text
//! radius ──► SearchStrategy (resolution, k)
//!              │
//!              ▼
//! center cell ──► k-ring ──► repository "cell in set" ──► candidates
//!                                                           │
//!                                             haversine ◄───┘
//!                                                │
//!                                      filter ≤ radius, sort
//! ```
//!
//! The cell lookup is a cheap over-approximation; the haversine filter makes
//! the answer exact.

use std::sync::Arc;

use tracing::debug;

use crate::coord::{haversine_meters, DistanceBand, GeoPoint, SearchStrategy};
use crate::error::GeoError;
use crate::model::{sort_by_distance, Poi, PoiId, StoreDistance};
use crate::repository::CandidateRepository;

/// Radius used to find POIs whose cached results a new store can affect.
pub const INVALIDATION_RADIUS: DistanceBand = DistanceBand::MAX;

/// Cell-filtered exact-distance resolver over a candidate repository.
#[derive(Clone)]
pub struct SpatialResolver {
    repository: Arc<dyn CandidateRepository>,
}

impl SpatialResolver {
    pub fn new(repository: Arc<dyn CandidateRepository>) -> Self {
        Self { repository }
    }

    /// The underlying repository.
    pub fn repository(&self) -> &Arc<dyn CandidateRepository> {
        &self.repository
    }

    /// Find the POI closest to `point`.
    ///
    /// Bands are tried smallest first; the first band with any POI inside
    /// it returns that band's closest POI. Equal distances go to the lower
    /// POI id.
    ///
    /// # Errors
    ///
    /// - `InvalidCoordinate` if `point` is out of range
    /// - `NoPoiNearby` if nothing lies within the widest band
    pub async fn find_nearest_poi(&self, point: GeoPoint) -> Result<Poi, GeoError> {
        point.validate()?;

        for band in DistanceBand::ALL {
            let candidates = self.pois_within(point, band).await?;
            if let Some((poi, distance)) = candidates
                .into_iter()
                .min_by_key(|(poi, distance)| (*distance, poi.id))
            {
                debug!(
                    poi_id = %poi.id,
                    band = %band,
                    distance_m = distance,
                    "Nearest POI resolved"
                );
                return Ok(poi);
            }
        }

        Err(GeoError::NoPoiNearby {
            lat: point.lat,
            lon: point.lon,
        })
    }

    /// Stores within `band` of a POI, ascending by distance.
    ///
    /// # Errors
    ///
    /// - `PoiNotFound` if the POI id is unknown
    pub async fn nearby_stores(
        &self,
        poi_id: PoiId,
        band: DistanceBand,
    ) -> Result<Vec<StoreDistance>, GeoError> {
        let poi = self
            .repository
            .poi(poi_id)
            .await?
            .ok_or(GeoError::PoiNotFound(poi_id))?;

        let strategy = band.strategy();
        let cells = strategy.candidate_cells(poi.location)?;
        let stores = self
            .repository
            .stores_in_cells(strategy.resolution, &cells)
            .await?;
        let candidates = stores.len();

        let mut rows: Vec<StoreDistance> = stores
            .iter()
            .map(|store| {
                StoreDistance::new(store.id, haversine_meters(poi.location, store.location))
            })
            .filter(|row| row.distance_m <= band.meters())
            .collect();
        sort_by_distance(&mut rows);
        rows.dedup_by_key(|row| row.store_id);

        debug!(
            poi_id = %poi_id,
            band = %band,
            candidates,
            matched = rows.len(),
            "Nearby stores resolved"
        );
        Ok(rows)
    }

    /// POIs within the invalidation radius of `point`.
    pub async fn affected_pois(&self, point: GeoPoint) -> Result<Vec<PoiId>, GeoError> {
        point.validate()?;
        let mut ids: Vec<PoiId> = self
            .pois_within(point, INVALIDATION_RADIUS)
            .await?
            .into_iter()
            .map(|(poi, _)| poi.id)
            .collect();
        ids.sort_unstable();
        ids.dedup();
        Ok(ids)
    }

    async fn pois_within(
        &self,
        point: GeoPoint,
        band: DistanceBand,
    ) -> Result<Vec<(Poi, u32)>, GeoError> {
        let strategy: SearchStrategy = band.strategy();
        let cells = strategy.candidate_cells(point)?;
        let pois = self
            .repository
            .pois_in_cells(strategy.resolution, &cells)
            .await?;

        Ok(pois
            .into_iter()
            .map(|poi| {
                let distance = haversine_meters(point, poi.location);
                (poi, distance)
            })
            .filter(|(_, distance)| *distance <= band.meters())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::BoxFuture;
    use crate::coord::fixtures::offset_north;
    use crate::coord::{CellId, GridResolution};
    use crate::model::{Store, StoreId};
    use crate::repository::{InMemoryRepository, RepositoryError};

    const CENTER: GeoPoint = GeoPoint::new(37.5, 127.03);

    fn poi_at(id: u64, point: GeoPoint) -> Poi {
        Poi::new(PoiId(id), format!("poi-{}", id), "test", point).unwrap()
    }

    fn store_at(id: u64, point: GeoPoint) -> Store {
        Store::new(StoreId(id), format!("store-{}", id), point).unwrap()
    }

    fn resolver(repo: InMemoryRepository) -> SpatialResolver {
        SpatialResolver::new(Arc::new(repo))
    }

    #[tokio::test]
    async fn test_nearest_prefers_smallest_band() {
        let repo = InMemoryRepository::with_records(
            [
                poi_at(1, offset_north(CENTER, 250.0)),
                poi_at(2, offset_north(CENTER, 1500.0)),
            ],
            [],
        );
        let poi = resolver(repo).find_nearest_poi(CENTER).await.unwrap();
        assert_eq!(poi.id, PoiId(1));
    }

    #[tokio::test]
    async fn test_nearest_picks_minimum_within_band() {
        let repo = InMemoryRepository::with_records(
            [
                poi_at(1, offset_north(CENTER, 480.0)),
                poi_at(2, offset_north(CENTER, 320.0)),
            ],
            [],
        );
        let poi = resolver(repo).find_nearest_poi(CENTER).await.unwrap();
        assert_eq!(poi.id, PoiId(2));
    }

    #[tokio::test]
    async fn test_nearest_tie_goes_to_lower_id() {
        let point = offset_north(CENTER, 100.0);
        let repo = InMemoryRepository::with_records([poi_at(9, point), poi_at(4, point)], []);
        let poi = resolver(repo).find_nearest_poi(CENTER).await.unwrap();
        assert_eq!(poi.id, PoiId(4));
    }

    #[tokio::test]
    async fn test_nearest_not_found_beyond_widest_band() {
        let repo = InMemoryRepository::with_records([poi_at(1, offset_north(CENTER, 2500.0))], []);
        let err = resolver(repo).find_nearest_poi(CENTER).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_nearest_rejects_invalid_point() {
        let err = resolver(InMemoryRepository::new())
            .find_nearest_poi(GeoPoint::new(f64::NAN, 0.0))
            .await
            .unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[tokio::test]
    async fn test_nearby_stores_sorted_and_bounded() {
        let repo = InMemoryRepository::with_records(
            [poi_at(1, CENTER)],
            [
                store_at(10, offset_north(CENTER, 450.0)),
                store_at(11, offset_north(CENTER, 120.0)),
                store_at(12, offset_north(CENTER, 900.0)),
            ],
        );
        let rows = resolver(repo)
            .nearby_stores(PoiId(1), DistanceBand::M500)
            .await
            .unwrap();
        assert_eq!(
            rows,
            vec![
                StoreDistance::new(StoreId(11), 120),
                StoreDistance::new(StoreId(10), 450),
            ]
        );
    }

    #[tokio::test]
    async fn test_nearby_stores_unknown_poi() {
        let err = resolver(InMemoryRepository::new())
            .nearby_stores(PoiId(1), DistanceBand::M300)
            .await
            .unwrap_err();
        assert!(matches!(err, GeoError::PoiNotFound(PoiId(1))));
    }

    #[tokio::test]
    async fn test_affected_pois_within_two_km() {
        let repo = InMemoryRepository::with_records(
            [
                poi_at(1, offset_north(CENTER, 300.0)),
                poi_at(2, offset_north(CENTER, 1900.0)),
                poi_at(3, offset_north(CENTER, 2600.0)),
            ],
            [],
        );
        let ids = resolver(repo).affected_pois(CENTER).await.unwrap();
        assert_eq!(ids, vec![PoiId(1), PoiId(2)]);
    }

    struct FailingRepository;

    impl CandidateRepository for FailingRepository {
        fn pois_in_cells<'a>(
            &'a self,
            _resolution: GridResolution,
            _cells: &'a [CellId],
        ) -> BoxFuture<'a, Result<Vec<Poi>, RepositoryError>> {
            Box::pin(async { Err(RepositoryError::Unavailable("offline".into())) })
        }

        fn stores_in_cells<'a>(
            &'a self,
            _resolution: GridResolution,
            _cells: &'a [CellId],
        ) -> BoxFuture<'a, Result<Vec<Store>, RepositoryError>> {
            Box::pin(async { Err(RepositoryError::Unavailable("offline".into())) })
        }

        fn poi(&self, _id: PoiId) -> BoxFuture<'_, Result<Option<Poi>, RepositoryError>> {
            Box::pin(async { Err(RepositoryError::Unavailable("offline".into())) })
        }

        fn stores_by_ids<'a>(
            &'a self,
            _ids: &'a [StoreId],
        ) -> BoxFuture<'a, Result<Vec<Store>, RepositoryError>> {
            Box::pin(async { Err(RepositoryError::Unavailable("offline".into())) })
        }
    }

    #[tokio::test]
    async fn test_repository_failure_propagates() {
        let resolver = SpatialResolver::new(Arc::new(FailingRepository));
        let err = resolver.find_nearest_poi(CENTER).await.unwrap_err();
        assert!(matches!(err, GeoError::Repository(_)));
    }

    mod property_tests {
        use super::*;
        use crate::coord::fixtures::destination;
        use crate::coord::haversine_meters;
        use proptest::prelude::*;

        fn block_on<F: std::future::Future>(future: F) -> F::Output {
            tokio::runtime::Builder::new_current_thread()
                .build()
                .unwrap()
                .block_on(future)
        }

        fn off_band_distance() -> impl Strategy<Value = u32> {
            (0u32..2600).prop_filter("band edge", |d| {
                !DistanceBand::ALL.iter().any(|band| band.meters() == *d)
            })
        }

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(64))]

            #[test]
            fn test_band_edge_stores_always_found(
                lat in -60.0..60.0_f64,
                lon in -179.0..179.0_f64,
                bearings in prop::collection::vec(0.0..360.0_f64, 12)
            ) {
                let center = GeoPoint::new(lat, lon);
                let mut stores = Vec::new();
                for (b, band) in DistanceBand::ALL.iter().enumerate() {
                    for (i, bearing) in bearings.iter().enumerate() {
                        let at = destination(center, *bearing, f64::from(band.meters()) - 0.6);
                        stores.push(store_at((b * 100 + i) as u64, at));
                    }
                }
                let repo = InMemoryRepository::with_records([poi_at(1, center)], stores);
                let resolver = resolver(repo);

                for (b, band) in DistanceBand::ALL.iter().enumerate() {
                    let rows = block_on(resolver.nearby_stores(PoiId(1), *band)).unwrap();
                    for i in 0..bearings.len() {
                        let id = StoreId((b * 100 + i) as u64);
                        prop_assert!(
                            rows.iter().any(|row| row.store_id == id),
                            "store {} missing from {} around ({}, {})", id, band, lat, lon
                        );
                    }
                }
            }

            #[test]
            fn test_nearest_is_global_minimum(
                lat in -60.0..60.0_f64,
                lon in -179.0..179.0_f64,
                placements in prop::collection::vec((0.0..360.0_f64, off_band_distance()), 0..20)
            ) {
                let center = GeoPoint::new(lat, lon);
                let pois: Vec<Poi> = placements
                    .iter()
                    .enumerate()
                    .map(|(i, (bearing, meters))| {
                        let at = destination(center, *bearing, f64::from(*meters) + 0.3);
                        poi_at(i as u64 + 1, at)
                    })
                    .collect();

                let expected = pois
                    .iter()
                    .map(|poi| (haversine_meters(center, poi.location), poi.id))
                    .filter(|(distance, _)| *distance <= DistanceBand::MAX.meters())
                    .min()
                    .map(|(_, id)| id);

                let resolver = resolver(InMemoryRepository::with_records(pois, []));
                match (block_on(resolver.find_nearest_poi(center)), expected) {
                    (Ok(poi), Some(id)) => prop_assert_eq!(poi.id, id),
                    (Err(e), None) => prop_assert!(e.is_not_found()),
                    (got, want) => {
                        prop_assert!(false, "got {:?}, want {:?}", got.map(|p| p.id), want)
                    }
                }
            }
        }
    }
}
