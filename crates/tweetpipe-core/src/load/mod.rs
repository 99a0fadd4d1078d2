//! Load stage
//!
//! - [`store`]: the [`EntityStore`] trait and its error type
//! - [`loader`]: dependency-aware loading of parsed records
//! - [`memory`]: in-memory store for dry runs and tests
//! - [`postgres`]: PostgreSQL store

pub mod loader;
pub mod memory;
pub mod postgres;
pub mod store;

use thiserror::Error;

use crate::error::TransformError;

pub use loader::{LoadStats, Loader, RecordOutcome};
pub use memory::MemoryEntityStore;
pub use postgres::PgEntityStore;
pub use store::{EntityStore, MaterializedInstance, StoreError, Upserted};

/// Failure while loading one record
#[derive(Error, Debug)]
pub enum LoadError {
    /// A natural-key field is absent or null; only this entity is skipped
    #[error("Entity '{entity}' is missing natural key field '{field}'")]
    MissingNaturalKey { entity: String, field: String },

    /// The raw document has no usable item list
    #[error("Raw document cannot be split into items: {0}")]
    Document(#[from] TransformError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl LoadError {
    /// Whether the batch can continue with the next record
    pub fn is_record_local(&self) -> bool {
        match self {
            Self::MissingNaturalKey { .. } => true,
            Self::Document(_) => false,
            Self::Store(e) => e.is_record_local(),
        }
    }
}
