//! Document and record types shared by the transform and load stages

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tweetpipe_common::time::datetime_to_twitter_format;

use crate::error::TransformError;

/// Flat mapping of field name to value
pub type FieldSet = serde_json::Map<String, Value>;

/// Top-level key holding the list of fetched items
pub const ITEMS_KEY: &str = "tweets";

/// Top-level key of the metadata block written by the extractor
pub const METADATA_KEY: &str = "tweetpipe_metadata";

/// Metadata attached to every fetched batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchMetadata {
    /// Fetch time in the remote API timestamp format
    pub fetched_at: String,
    pub username: String,
    pub count: u32,
}

impl FetchMetadata {
    pub fn new(username: impl Into<String>, count: u32, fetched_at: &DateTime<Utc>) -> Self {
        Self {
            fetched_at: datetime_to_twitter_format(fetched_at),
            username: username.into(),
            count,
        }
    }

    /// The metadata block as stored in a raw document
    pub fn to_field_set(&self) -> FieldSet {
        let mut block = FieldSet::new();
        block.insert("fetched_at".to_string(), Value::from(self.fetched_at.as_str()));
        block.insert("username".to_string(), Value::from(self.username.as_str()));
        block.insert("count".to_string(), Value::from(self.count));
        block
    }
}

/// Raw batch as produced by the extractor
///
/// Holds the item list under [`ITEMS_KEY`]; every other top-level key is
/// metadata shared by all items. Stored verbatim in the raw store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawDocument(FieldSet);

impl RawDocument {
    /// Builds the document the extractor persists
    pub fn new(items: Vec<Value>, metadata: &FetchMetadata) -> Self {
        let mut document = FieldSet::new();
        document.insert(METADATA_KEY.to_string(), Value::Object(metadata.to_field_set()));
        document.insert(ITEMS_KEY.to_string(), Value::Array(items));
        Self(document)
    }

    pub fn from_map(document: FieldSet) -> Self {
        Self(document)
    }

    pub fn as_map(&self) -> &FieldSet {
        &self.0
    }

    pub fn into_map(self) -> FieldSet {
        self.0
    }

    /// Number of items, or zero when the item key is missing or not a list
    pub fn item_count(&self, items_key: &str) -> usize {
        self.0
            .get(items_key)
            .and_then(Value::as_array)
            .map_or(0, Vec::len)
    }

    /// Splits the document into its items and the shared metadata
    pub fn into_parts(mut self, items_key: &str) -> Result<(Vec<Value>, FieldSet), TransformError> {
        match self.0.remove(items_key) {
            Some(Value::Array(items)) => Ok((items, self.0)),
            Some(_) => Err(TransformError::NotAList {
                field: items_key.to_string(),
            }),
            None => Err(TransformError::PathNotFound {
                path: items_key.to_string(),
                segment: items_key.to_string(),
            }),
        }
    }
}

/// Output of one record parser for one item
#[derive(Debug, Clone, PartialEq)]
pub enum EntityData {
    One(FieldSet),
    Many(Vec<FieldSet>),
}

impl EntityData {
    pub fn len(&self) -> usize {
        match self {
            Self::One(_) => 1,
            Self::Many(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// First (or only) field set
    pub fn first(&self) -> Option<&FieldSet> {
        match self {
            Self::One(fields) => Some(fields),
            Self::Many(items) => items.first(),
        }
    }

    pub fn into_vec(self) -> Vec<FieldSet> {
        match self {
            Self::One(fields) => vec![fields],
            Self::Many(items) => items,
        }
    }
}

/// One entity payload produced by one record parser run
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRecord {
    pub entity: String,
    pub data: EntityData,
}

/// All entity payloads parsed from one raw item
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MultiEntityRecord {
    /// Position of the item in the batch
    pub index: usize,
    pub entities: BTreeMap<String, EntityData>,
}

impl MultiEntityRecord {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            entities: BTreeMap::new(),
        }
    }

    /// Shallow merge: a later record for the same entity replaces the earlier one
    pub fn merge(&mut self, record: ParsedRecord) {
        self.entities.insert(record.entity, record.data);
    }

    pub fn get(&self, entity: &str) -> Option<&EntityData> {
        self.entities.get(entity)
    }

    pub fn take(&mut self, entity: &str) -> Option<EntityData> {
        self.entities.remove(entity)
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}
