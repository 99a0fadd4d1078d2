//! Transforms shared by every tweet parser

use serde_json::Value;
use tweetpipe_common::time::twitter_time_to_rfc3339;

use super::record::RecordParserBuilder;
use crate::document::METADATA_KEY;
use crate::error::ValueError;

/// Field set by the extractor on every batch
pub const FETCHED_AT: &str = "fetched_at";

/// Selector for the metadata block
pub fn metadata_selector() -> String {
    format!("{}.*", METADATA_KEY)
}

/// Adds the metadata selector and the `fetched_at` transform to a parser
///
/// The selector is prepended, so the parser's own paths win on collisions.
/// The `fetched_at` transform is skipped when the field is absent, leaving the
/// loader to decide whether the entity can be keyed. A `fetched_at` transform
/// declared by the parser is kept.
pub fn with_common_transforms(builder: RecordParserBuilder) -> RecordParserBuilder {
    builder
        .prepend_fields([metadata_selector()])
        .default_field_transform(FETCHED_AT, parse_timestamp)
}

/// Normalizes a remote API timestamp to RFC 3339 (UTC)
///
/// Null stays null so optional timestamps survive.
pub fn parse_timestamp(value: Value) -> Result<Value, ValueError> {
    match value {
        Value::String(raw) => Ok(Value::String(twitter_time_to_rfc3339(&raw)?)),
        Value::Null => Ok(Value::Null),
        other => Err(ValueError::new(format!("expected a timestamp string, got {}", other))),
    }
}
