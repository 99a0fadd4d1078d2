//! Raw document storage
//!
//! Raw batches are written once per fetch under
//! `{identity}/{%Y%m%dT%H%M%SZ}.json` and can be read back to replay the
//! transform and load stages.

pub mod local;
pub mod s3;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tweetpipe_common::time::datetime_to_key_format;
use tweetpipe_common::TweetpipeError;

use crate::config::StorageConfig;
use crate::document::RawDocument;

pub use local::LocalRawStore;
pub use s3::S3RawStore;

/// Raw store failures
#[derive(Error, Debug)]
pub enum RawStoreError {
    #[error("Raw document '{0}' not found")]
    NotFound(String),

    #[error("Invalid raw document key '{0}'")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Raw document is not valid JSON: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("S3 error: {0}")]
    S3(String),
}

/// Which raw store to use
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Local,
    S3,
}

impl FromStr for StorageBackend {
    type Err = TweetpipeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" | "file" => Ok(Self::Local),
            "s3" => Ok(Self::S3),
            other => Err(TweetpipeError::config(format!(
                "unknown storage backend '{}' (expected local or s3)",
                other
            ))),
        }
    }
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => f.write_str("local"),
            Self::S3 => f.write_str("s3"),
        }
    }
}

/// Keys under a prefix
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Listing {
    pub prefix: String,
    pub count: usize,
    /// Sorted keys
    pub keys: Vec<String>,
}

impl Listing {
    pub fn new(prefix: Option<&str>, mut keys: Vec<String>) -> Self {
        keys.sort();
        Self {
            prefix: prefix.unwrap_or_default().to_string(),
            count: keys.len(),
            keys,
        }
    }
}

/// Storage for raw documents
#[async_trait]
pub trait RawStore: Send + Sync {
    /// Backend name used in logs
    fn name(&self) -> &str;

    async fn write(&self, key: &str, document: &RawDocument) -> Result<(), RawStoreError>;

    async fn read(&self, key: &str) -> Result<RawDocument, RawStoreError>;

    /// Keys starting with `prefix`, or every key when `prefix` is `None`
    async fn list(&self, prefix: Option<&str>) -> Result<Listing, RawStoreError>;
}

/// Key of a raw document fetched for `identity` at `fetched_at`
pub fn document_key(identity: &str, fetched_at: &DateTime<Utc>) -> String {
    format!("{}/{}.json", identity, datetime_to_key_format(fetched_at))
}

/// Rejects keys that could escape the store root
pub fn validate_key(key: &str) -> Result<(), RawStoreError> {
    let invalid = key.is_empty()
        || key.starts_with('/')
        || key.contains('\\')
        || key.split('/').any(|segment| segment.is_empty() || segment == "." || segment == "..");

    if invalid {
        return Err(RawStoreError::InvalidKey(key.to_string()));
    }
    Ok(())
}

/// Opens the configured raw store
pub async fn open(config: &StorageConfig) -> Result<Box<dyn RawStore>, RawStoreError> {
    match config.backend {
        StorageBackend::Local => Ok(Box::new(LocalRawStore::new(&config.data_dir))),
        StorageBackend::S3 => Ok(Box::new(S3RawStore::new(config.s3.clone()).await?)),
    }
}
