//! Entity store abstraction
//!
//! The loader talks to storage only through [`EntityStore`]. Every record is
//! loaded between `begin` and `commit`/`rollback`, so a store decides what a
//! transaction means (a PostgreSQL transaction, an in-memory snapshot).

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::document::FieldSet;
use crate::schema::EntitySchema;

/// Storage-side failure while persisting an entity
#[derive(Error, Debug)]
pub enum StoreError {
    /// Constraint violation caused by the data of the current record
    #[error("Integrity violation on '{entity}': {message}")]
    ReferentialIntegrity { entity: String, message: String },

    /// A value of the current record cannot be stored as its column type
    #[error("Invalid data for '{entity}': {message}")]
    InvalidData { entity: String, message: String },

    /// The store itself is unavailable or misbehaving
    #[error("Entity store backend error: {0}")]
    Backend(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl StoreError {
    pub fn integrity(entity: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ReferentialIntegrity {
            entity: entity.into(),
            message: message.into(),
        }
    }

    pub fn invalid_data(entity: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidData {
            entity: entity.into(),
            message: message.into(),
        }
    }

    /// Whether the error is caused by the record being loaded
    pub fn is_record_local(&self) -> bool {
        matches!(self, Self::ReferentialIntegrity { .. } | Self::InvalidData { .. })
    }
}

/// Handle to a persisted entity instance
#[derive(Debug, Clone, PartialEq)]
pub struct MaterializedInstance {
    pub entity: String,
    /// Value dependents store in their foreign-key field
    pub reference: Value,
}

/// Result of one upsert
#[derive(Debug, Clone, PartialEq)]
pub struct Upserted {
    pub instance: MaterializedInstance,
    /// `false` when an existing instance was updated
    pub created: bool,
}

/// Persistent entity storage with find-or-create by natural key
#[async_trait]
pub trait EntityStore: Send {
    /// Store name used in logs
    fn name(&self) -> &str;

    async fn begin(&mut self) -> Result<(), StoreError>;

    /// Finds the instance matching `natural_key` or creates it
    ///
    /// All `fields` overwrite the stored values. A constraint violation is
    /// reported as [`StoreError::ReferentialIntegrity`].
    async fn upsert(
        &mut self,
        entity: &EntitySchema,
        natural_key: FieldSet,
        fields: FieldSet,
    ) -> Result<Upserted, StoreError>;

    async fn commit(&mut self) -> Result<(), StoreError>;

    async fn rollback(&mut self) -> Result<(), StoreError>;
}
