//! `add-store`: append a store to the dataset and invalidate nearby caches.

use clap::Args;
use geoband::config::ConfigFile;
use geoband::coord::DistanceBand;
use geoband::resolver::SpatialResolver;
use tracing::info;

use super::common::{DataArgs, Session};
use crate::dataset::StoreRecord;
use crate::error::CliError;

#[derive(Debug, Args)]
pub struct AddStoreArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// Store name
    #[arg(long)]
    pub name: String,

    /// Latitude in degrees
    #[arg(long, allow_negative_numbers = true)]
    pub lat: f64,

    /// Longitude in degrees
    #[arg(long, allow_negative_numbers = true)]
    pub lon: f64,

    /// Store id (defaults to the next unused id)
    #[arg(long)]
    pub id: Option<u64>,
}

/// Add a store, then signal invalidation for every POI within 2000 m.
pub async fn run(args: AddStoreArgs, config: &ConfigFile) -> Result<(), CliError> {
    let mut session = Session::open(&args.data, config)?;

    let record = StoreRecord {
        id: args.id.unwrap_or_else(|| session.dataset.next_store_id()),
        name: args.name,
        lat: args.lat,
        lon: args.lon,
    };
    let store = record.to_store()?;

    let affected = SpatialResolver::new(session.repository.clone())
        .affected_pois(store.location)
        .await?;

    session.repository.insert_store(store.clone());
    session.dataset.stores.retain(|s| s.id != record.id);
    session.dataset.stores.push(record);
    session.dataset.save(&args.data.data)?;

    let queued = session.app.service().on_store_written(&store);
    info!(store_id = %store.id, queued, "Store written");
    session.close().await;

    println!(
        "Added store {} at {}; {} POI(s) within {} affected",
        store.id,
        store.location,
        affected.len(),
        DistanceBand::MAX
    );
    Ok(())
}
