//! End-to-end search tests over the public API.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::offset_north;
use geoband::cache::MemoryStore;
use geoband::clock::ManualClock;
use geoband::controller::FixedMetricsSource;
use geoband::coord::haversine_meters;
use geoband::repository::InMemoryRepository;
use geoband::resolver::SpatialResolver;
use geoband::{
    AppConfig, DistanceBand, GeoBandApp, GeoError, GeoPoint, Poi, PoiId, Store, StoreId,
};

const CENTER: GeoPoint = GeoPoint::new(37.5000, 127.0300);

fn repository() -> Arc<InMemoryRepository> {
    Arc::new(InMemoryRepository::with_records(
        [
            Poi::new(PoiId(1), "Central Plaza", "landmark", CENTER).unwrap(),
            Poi::new(PoiId(2), "North Park", "park", offset_north(CENTER, 3000.0)).unwrap(),
        ],
        [
            Store::new(StoreId(1), "A", offset_north(CENTER, 120.0)).unwrap(),
            Store::new(StoreId(2), "B", offset_north(CENTER, 450.0)).unwrap(),
            Store::new(StoreId(3), "C", offset_north(CENTER, 900.0)).unwrap(),
        ],
    ))
}

fn start(repo: Arc<InMemoryRepository>) -> GeoBandApp {
    let clock = ManualClock::starting_now();
    GeoBandApp::start_with_clock(
        AppConfig::new(),
        repo,
        Arc::new(MemoryStore::new(clock.clone())),
        Arc::new(FixedMetricsSource::default()),
        clock,
    )
    .unwrap()
}

fn ids(rows: &[geoband::StoreDistance]) -> Vec<u64> {
    rows.iter().map(|r| r.store_id.0).collect()
}

#[tokio::test]
async fn test_bands_filter_and_order_stores() {
    let app = start(repository());
    let service = app.service();

    let r300 = service.get_nearby_stores(PoiId(1), 300).await.unwrap();
    let r500 = service.get_nearby_stores(PoiId(1), 500).await.unwrap();
    let r1000 = service.get_nearby_stores(PoiId(1), 1000).await.unwrap();

    assert_eq!(ids(&r300), vec![1]);
    assert_eq!(ids(&r500), vec![1, 2]);
    assert_eq!(ids(&r1000), vec![1, 2, 3]);
    assert_eq!(
        r1000.iter().map(|r| r.distance_m).collect::<Vec<_>>(),
        vec![120, 450, 900]
    );

    app.shutdown().await;
}

#[tokio::test]
async fn test_every_band_respects_its_radius() {
    let app = start(repository());

    for band in DistanceBand::ALL {
        let rows = app
            .service()
            .get_nearby_stores(PoiId(1), band.meters())
            .await
            .unwrap();
        assert!(rows.iter().all(|r| r.distance_m <= band.meters()));
        assert!(rows.windows(2).all(|w| w[0].distance_m <= w[1].distance_m));
    }

    app.shutdown().await;
}

#[tokio::test]
async fn test_cached_result_matches_recomputation() {
    let repo = repository();
    let app = start(repo.clone());

    let first = app.service().get_nearby_stores(PoiId(1), 1000).await.unwrap();
    let cached = app.service().get_nearby_stores(PoiId(1), 1000).await.unwrap();
    let direct = SpatialResolver::new(repo)
        .nearby_stores(PoiId(1), DistanceBand::M1000)
        .await
        .unwrap();

    assert_eq!(first, cached);
    assert_eq!(cached, direct);
    assert_eq!(app.service().metrics().system_snapshot().hits, 1);

    app.shutdown().await;
}

#[tokio::test]
async fn test_nearest_poi_is_global_minimum() {
    let app = start(repository());

    let near_center = offset_north(CENTER, 100.0);
    let poi = app
        .service()
        .find_nearest_poi(near_center.lat, near_center.lon)
        .await
        .unwrap();
    assert_eq!(poi.id, PoiId(1));

    let near_park = offset_north(CENTER, 2800.0);
    let poi = app
        .service()
        .find_nearest_poi(near_park.lat, near_park.lon)
        .await
        .unwrap();
    assert_eq!(poi.id, PoiId(2));
    assert_eq!(haversine_meters(near_park, poi.location), 200);

    app.shutdown().await;
}

#[tokio::test]
async fn test_nothing_nearby() {
    let app = start(repository());
    let err = app.service().find_nearest_poi(-33.86, 151.21).await.unwrap_err();
    assert!(matches!(err, GeoError::NoPoiNearby { .. }));
    assert!(err.is_not_found());
    app.shutdown().await;
}

#[tokio::test]
async fn test_input_validation() {
    let app = start(repository());

    assert!(app
        .service()
        .get_nearby_stores(PoiId(1), 850)
        .await
        .unwrap_err()
        .is_invalid_argument());
    assert!(app
        .service()
        .find_nearest_poi(f64::NAN, 127.0)
        .await
        .unwrap_err()
        .is_invalid_argument());
    assert!(app
        .service()
        .get_nearby_stores(PoiId(99), 500)
        .await
        .unwrap_err()
        .is_not_found());

    app.shutdown().await;
}

#[tokio::test]
async fn test_new_store_appears_after_invalidation() {
    let repo = repository();
    let app = start(repo.clone());

    let before = app.service().get_nearby_stores(PoiId(1), 500).await.unwrap();
    assert_eq!(ids(&before), vec![1, 2]);

    let store = Store::new(StoreId(4), "D", offset_north(CENTER, 60.0)).unwrap();
    repo.insert_store(store.clone());
    assert!(app.service().on_store_written(&store));

    let mut after = Vec::new();
    for _ in 0..100 {
        after = app.service().get_nearby_stores(PoiId(1), 500).await.unwrap();
        if after.len() == 3 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(ids(&after), vec![4, 1, 2]);

    app.shutdown().await;
}

#[tokio::test]
async fn test_store_details() {
    let app = start(repository());
    let details = app
        .service()
        .get_nearby_store_details(PoiId(1), 500)
        .await
        .unwrap();

    let names: Vec<_> = details.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, vec!["A", "B"]);
    assert_eq!(details[1].distance_m, 450);

    app.shutdown().await;
}
