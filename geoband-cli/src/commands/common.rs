//! Shared setup for commands that run searches.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use geoband::cache::MemoryStore;
use geoband::clock;
use geoband::config::ConfigFile;
use geoband::controller::ProcMetricsSource;
use geoband::repository::InMemoryRepository;
use geoband::{AppConfig, GeoBandApp};

use crate::dataset::Dataset;
use crate::error::CliError;

/// Dataset selection shared by every search command.
#[derive(Debug, Args)]
pub struct DataArgs {
    /// JSON dataset of POIs and stores
    #[arg(long, short = 'd', value_name = "FILE")]
    pub data: PathBuf,
}

/// Loaded dataset plus a running application over it.
pub struct Session {
    pub dataset: Dataset,
    pub repository: Arc<InMemoryRepository>,
    pub app: GeoBandApp,
}

impl Session {
    /// Load the dataset and start the application.
    ///
    /// The distributed tier is an in-process store, so cache state does not
    /// outlive the command.
    pub fn open(args: &DataArgs, config: &ConfigFile) -> Result<Self, CliError> {
        let dataset = Dataset::load(&args.data)?;
        let repository = Arc::new(dataset.to_repository()?);
        let app = GeoBandApp::start(
            AppConfig::from_config_file(config),
            repository.clone(),
            Arc::new(MemoryStore::new(clock::system())),
            Arc::new(ProcMetricsSource::new()),
        )?;
        Ok(Self {
            dataset,
            repository,
            app,
        })
    }

    pub async fn close(self) {
        self.app.shutdown().await;
    }
}
