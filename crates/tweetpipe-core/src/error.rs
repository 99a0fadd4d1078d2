//! Error types for the transform stage
//!
//! Storage-side errors live next to their stores (`load::StoreError`,
//! `raw_store::RawStoreError`).

use thiserror::Error;
use tweetpipe_common::TweetpipeError;

/// A parser or entity registry was declared incorrectly
///
/// Raised while constructing parsers and registries, before any data is
/// processed. Never recoverable at runtime.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("Parser '{parser}' does not declare a target entity")]
    MissingEntity { parser: String },

    #[error("Parser '{parser}' does not declare a field spec")]
    MissingFieldSpec { parser: String },

    #[error("Entity '{0}' is not registered")]
    UnknownEntity(String),

    #[error("Entity '{0}' is registered twice")]
    DuplicateEntity(String),

    #[error("Entity '{entity}' declares key or foreign-key field '{field}' that is not persisted")]
    UndeclaredField { entity: String, field: String },

    #[error("Entity '{entity}' references '{references}' which is not loaded before it")]
    ForeignKeyOrder { entity: String, references: String },

    #[error("Invalid identifier '{0}': only lowercase letters, digits and '_' are allowed")]
    InvalidIdentifier(String),

    #[error("Batch parser needs at least one record parser")]
    NoParsers,
}

/// Failure of a single-value field transform
///
/// Field transforms only see the value, the record parser attaches the entity
/// and field name when converting into [`TransformError::InvalidValue`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct ValueError(pub String);

impl ValueError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

impl From<TweetpipeError> for ValueError {
    fn from(err: TweetpipeError) -> Self {
        Self(err.to_string())
    }
}

/// Malformed or unexpected input document shape
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransformError {
    #[error("Path '{path}' not found: no key '{segment}'")]
    PathNotFound { path: String, segment: String },

    #[error("Path '{path}' does not point to a mapping")]
    NotAMapping { path: String },

    #[error("Field '{field}' is not a list")]
    NotAList { field: String },

    #[error("Field '{field}' required by entity '{entity}' is missing")]
    MissingField { entity: String, field: String },

    #[error("Invalid value for '{entity}.{field}': {reason}")]
    InvalidValue {
        entity: String,
        field: String,
        reason: String,
    },
}

impl TransformError {
    pub fn missing_field(entity: impl Into<String>, field: impl Into<String>) -> Self {
        Self::MissingField {
            entity: entity.into(),
            field: field.into(),
        }
    }

    pub fn invalid_value(
        entity: impl Into<String>,
        field: impl Into<String>,
        reason: impl ToString,
    ) -> Self {
        Self::InvalidValue {
            entity: entity.into(),
            field: field.into(),
            reason: reason.to_string(),
        }
    }
}

/// A single batch item that could not be turned into a record
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Item {index}{}: {source}", parser.as_ref().map(|p| format!(" (parser '{}')", p)).unwrap_or_default())]
pub struct ItemError {
    /// Position of the item in the raw item list
    pub index: usize,
    /// Parser that failed, if the failure happened inside one
    pub parser: Option<String>,
    #[source]
    pub source: TransformError,
}
