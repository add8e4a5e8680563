//! Configuration CLI commands.

use std::path::Path;

use clap::Subcommand;
use geoband::config::ConfigFile;

use crate::error::CliError;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Show the effective configuration
    Show,

    /// Show the configuration file path
    Path,
}

/// Run a config subcommand.
pub fn run(command: ConfigCommands, path: &Path) -> Result<(), CliError> {
    match command {
        ConfigCommands::Show => run_show(path),
        ConfigCommands::Path => {
            println!("{}", path.display());
            Ok(())
        }
    }
}

fn run_show(path: &Path) -> Result<(), CliError> {
    let config = ConfigFile::load_or_default(path)?;

    println!("[cache]");
    println!("local_capacity = {}", config.cache.local_capacity);
    println!("local_ttl_minutes = {}", config.cache.local_ttl.as_secs() / 60);
    println!(
        "stale_refresh_delay_minutes = {}",
        config.cache.stale_refresh_delay.as_secs() / 60
    );
    println!("metadata_ttl_days = {}", config.cache.metadata_ttl.as_secs() / 86_400);
    println!();
    println!("[hotspot]");
    println!("initial_threshold = {}", config.hotspot.initial_threshold);
    println!(
        "counter_window_minutes = {}",
        config.hotspot.tracker.counter_window.as_secs() / 60
    );
    println!(
        "hotspot_ttl_hours = {}",
        config.hotspot.tracker.hotspot_ttl.as_secs() / 3600
    );
    println!(
        "last_access_ttl_days = {}",
        config.hotspot.tracker.last_access_ttl.as_secs() / 86_400
    );
    println!(
        "reevaluate_interval_minutes = {}",
        config.hotspot.tracker.reevaluate_interval.as_secs() / 60
    );
    println!();
    println!("[controller]");
    println!("interval_secs = {}", config.controller.interval.as_secs());
    println!(
        "initial_cache_ttl_minutes = {}",
        config.controller.initial_cache_ttl_minutes
    );
    println!();
    println!("[invalidation]");
    println!("channel_capacity = {}", config.invalidation.channel_capacity);
    println!("policy = {}", config.invalidation.policy);
    println!();
    println!("[logging]");
    match &config.logging.directory {
        Some(dir) => println!("directory = {}", dir.display()),
        None => println!("directory = (stderr only)"),
    }
    println!("file_name = {}", config.logging.file_name);
    println!("level = {}", config.logging.level);
    Ok(())
}
