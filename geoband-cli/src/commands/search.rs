//! Search commands: `nearest` and `nearby`.

use clap::Args;
use geoband::config::ConfigFile;
use geoband::PoiId;

use super::common::{DataArgs, Session};
use crate::error::CliError;

#[derive(Debug, Args)]
pub struct NearestArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// Latitude in degrees
    #[arg(long, allow_negative_numbers = true)]
    pub lat: f64,

    /// Longitude in degrees
    #[arg(long, allow_negative_numbers = true)]
    pub lon: f64,
}

#[derive(Debug, Args)]
pub struct NearbyArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// POI id
    #[arg(long)]
    pub poi: u64,

    /// Distance band in meters (300, 500, 700, 1000 or 2000)
    #[arg(long, default_value_t = 500)]
    pub band: u32,

    /// Include store names and coordinates
    #[arg(long)]
    pub details: bool,
}

/// Print the POI nearest a coordinate.
pub async fn run_nearest(args: NearestArgs, config: &ConfigFile) -> Result<(), CliError> {
    let session = Session::open(&args.data, config)?;
    let result = session.app.service().find_nearest_poi(args.lat, args.lon).await;
    session.close().await;

    let poi = result?;
    println!(
        "{}  {}  [{}]  {}",
        poi.id, poi.name, poi.category, poi.location
    );
    Ok(())
}

/// Print the stores within a band of a POI.
pub async fn run_nearby(args: NearbyArgs, config: &ConfigFile) -> Result<(), CliError> {
    let session = Session::open(&args.data, config)?;
    let service = session.app.service().clone();
    let poi = PoiId(args.poi);

    let result = if args.details {
        service
            .get_nearby_store_details(poi, args.band)
            .await
            .map(|rows| {
                rows.iter()
                    .map(|r| {
                        format!(
                            "{:>6} m  {}  {}  {}",
                            r.distance_m, r.store_id, r.name, r.location
                        )
                    })
                    .collect::<Vec<_>>()
            })
    } else {
        service.get_nearby_stores(poi, args.band).await.map(|rows| {
            rows.iter()
                .map(|r| format!("{:>6} m  {}", r.distance_m, r.store_id))
                .collect::<Vec<_>>()
        })
    };
    session.close().await;

    let lines = result?;
    if lines.is_empty() {
        println!("No stores within {} m of POI {}", args.band, args.poi);
    }
    for line in lines {
        println!("{}", line);
    }
    Ok(())
}
