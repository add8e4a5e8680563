//! geoband CLI - nearest-POI and nearby-store lookups.

mod commands;
mod dataset;
mod error;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use geoband::config::{config_file_path, ConfigFile};
use geoband::logging::init_logging;

use commands::config::ConfigCommands;
use commands::search::{NearbyArgs, NearestArgs};
use commands::store::AddStoreArgs;
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "geoband", version, about = "POI proximity search with a hotspot-aware cache")]
struct Cli {
    /// Configuration file (defaults to ~/.geoband/config.ini)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Find the POI nearest a coordinate
    Nearest(NearestArgs),

    /// List stores within a distance band of a POI
    Nearby(NearbyArgs),

    /// Add a store to the dataset and invalidate nearby caches
    AddStore(AddStoreArgs),

    /// Inspect configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}

fn run() -> Result<(), CliError> {
    let cli = Cli::parse();
    let config_path = cli.config.unwrap_or_else(config_file_path);

    if let Commands::Config { command } = cli.command {
        return commands::config::run(command, &config_path);
    }

    let config = ConfigFile::load_or_default(&config_path)?;
    let _logging = init_logging(&config.logging)?;

    let runtime = tokio::runtime::Runtime::new().map_err(|e| CliError::Runtime(e.to_string()))?;
    runtime.block_on(async {
        match cli.command {
            Commands::Nearest(args) => commands::search::run_nearest(args, &config).await,
            Commands::Nearby(args) => commands::search::run_nearby(args, &config).await,
            Commands::AddStore(args) => commands::store::run(args, &config).await,
            Commands::Config { .. } => Ok(()),
        }
    })
}
