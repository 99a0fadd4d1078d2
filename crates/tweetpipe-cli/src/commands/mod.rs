//! CLI command implementations
//!
//! Each action has its own module with a `run` function. Store selection
//! shared by the loading commands lives here.

pub mod list;
pub mod rerun;
pub mod run;

use tracing::{debug, info};
use tweetpipe_core::config::Config;
use tweetpipe_core::load::{EntityStore, MemoryEntityStore, PgEntityStore};
use tweetpipe_core::raw_store::{self, RawStore, StorageBackend};
use tweetpipe_core::PipelineResult;

use crate::error::{CliError, Result};

/// Loads `.env` and the environment, with `--storage` taking precedence
pub fn load_config(storage: Option<StorageBackend>) -> Result<Config> {
    let mut config = Config::load().map_err(|e| CliError::config(e.to_string()))?;

    if let Some(backend) = storage {
        config.storage.backend = backend;
        config.validate().map_err(|e| CliError::config(e.to_string()))?;
    }

    debug!(storage = %config.storage.backend, "Configuration loaded");
    Ok(config)
}

pub async fn open_raw_store(config: &Config) -> Result<Box<dyn RawStore>> {
    Ok(raw_store::open(&config.storage).await?)
}

/// Entity store a command loads into
pub enum Target {
    /// `--dry-run`: nothing leaves the process
    Memory(MemoryEntityStore),
    Postgres(PgEntityStore),
}

impl Target {
    pub async fn open(config: &Config, dry_run: bool) -> Result<Self> {
        if dry_run {
            info!("Dry run: loading into memory");
            return Ok(Self::Memory(MemoryEntityStore::new()));
        }

        let store = PgEntityStore::connect(&config.database).await?;
        Ok(Self::Postgres(store))
    }

    pub fn store(&mut self) -> &mut dyn EntityStore {
        match self {
            Self::Memory(store) => store,
            Self::Postgres(store) => store,
        }
    }
}

/// Prints the outcome of a pipeline run
pub(crate) fn report(result: &PipelineResult, target: &Target) {
    println!("Raw document: {}", result.key);
    println!("{}", result.stats);

    if let Target::Memory(store) = target {
        println!();
        println!("Dry run, entities in memory:");
        for (entity, count) in store.counts() {
            println!("  {:<20} {}", entity, count);
        }
    }

    if !result.is_complete() {
        println!();
        println!("Some records were not loaded, see the log for details.");
    }
}
