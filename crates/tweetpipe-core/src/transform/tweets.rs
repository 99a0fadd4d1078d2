//! Entity set and parsers for user timelines
//!
//! Entities, in load order:
//!
//! | Entity | Natural key | Foreign keys |
//! |---|---|---|
//! | `author` | `id` | |
//! | `post` | `id` | `author` → `author` |
//! | `follower_snapshot` | `author`, `fetched_at` | `author` → `author` |
//! | `hashtag` | `text`, `post` | `post` → `post` |

use serde_json::Value;

use super::common::{parse_timestamp, with_common_transforms};
use super::record::RecordParser;
use crate::document::FieldSet;
use crate::error::{ConfigurationError, TransformError};
use crate::schema::{EntityRegistry, EntitySchema};

pub const AUTHOR: &str = "author";
pub const POST: &str = "post";
pub const FOLLOWER_SNAPSHOT: &str = "follower_snapshot";
pub const HASHTAG: &str = "hashtag";

pub fn author_schema() -> EntitySchema {
    EntitySchema::new(AUTHOR).with_fields([
        "id",
        "screen_name",
        "name",
        "created_at",
        "followers_count",
        "friends_count",
        "favourites_count",
        "fetched_at",
    ])
}

pub fn post_schema() -> EntitySchema {
    EntitySchema::new(POST)
        .with_fields([
            "id",
            "created_at",
            "author",
            "full_text",
            "retweet_count",
            "favorite_count",
            "fetched_at",
            "url",
            "text",
        ])
        .with_foreign_key("author", AUTHOR)
}

pub fn follower_snapshot_schema() -> EntitySchema {
    EntitySchema::new(FOLLOWER_SNAPSHOT)
        .with_fields(["author", "count", "fetched_at"])
        .with_natural_key(["author", "fetched_at"])
        .with_foreign_key("author", AUTHOR)
}

pub fn hashtag_schema() -> EntitySchema {
    EntitySchema::new(HASHTAG)
        .with_fields(["text", "post", "fetched_at"])
        .with_natural_key(["text", "post"])
        .with_foreign_key("post", POST)
}

/// All timeline entities in load order
pub fn tweet_registry() -> Result<EntityRegistry, ConfigurationError> {
    EntityRegistry::new(vec![
        author_schema(),
        post_schema(),
        follower_snapshot_schema(),
        hashtag_schema(),
    ])
}

pub fn author_parser(registry: &EntityRegistry) -> Result<RecordParser, ConfigurationError> {
    with_common_transforms(
        RecordParser::builder("author")
            .entity(registry.require(AUTHOR)?)
            .fields(["user.*"])
            .field_transform("created_at", parse_timestamp),
    )
    .build()
}

pub fn post_parser(registry: &EntityRegistry) -> Result<RecordParser, ConfigurationError> {
    with_common_transforms(
        RecordParser::builder("post")
            .entity(registry.require(POST)?)
            .fields(["*"])
            .field_transform("created_at", parse_timestamp)
            .record_transform(split_full_text),
    )
    .build()
}

pub fn follower_snapshot_parser(registry: &EntityRegistry) -> Result<RecordParser, ConfigurationError> {
    with_common_transforms(
        RecordParser::builder("follower_snapshot")
            .entity(registry.require(FOLLOWER_SNAPSHOT)?)
            .fields(["user.followers_count"])
            .record_transform(copy_followers_count),
    )
    .build()
}

pub fn hashtag_parser(registry: &EntityRegistry) -> Result<RecordParser, ConfigurationError> {
    with_common_transforms(
        RecordParser::builder("hashtag")
            .entity(registry.require(HASHTAG)?)
            .fields(["entities.hashtags"])
            .many("hashtags"),
    )
    .build()
}

/// Parsers for every entity of [`tweet_registry`]
pub fn tweet_parsers(registry: &EntityRegistry) -> Result<Vec<RecordParser>, ConfigurationError> {
    Ok(vec![
        author_parser(registry)?,
        post_parser(registry)?,
        follower_snapshot_parser(registry)?,
        hashtag_parser(registry)?,
    ])
}

/// Splits `full_text` into the displayed `text` and the trailing `url`
///
/// `display_text_range` holds character offsets `[start, end]` of the
/// displayed text. Everything after `end` (minus the separating space) is the
/// link to the post.
pub fn split_full_text(data: &mut FieldSet) -> Result<(), TransformError> {
    let full_text = data
        .get("full_text")
        .and_then(Value::as_str)
        .ok_or_else(|| TransformError::missing_field(POST, "full_text"))?;

    let (start, end) = match data.get("display_text_range").and_then(Value::as_array) {
        Some(range) => match range.as_slice() {
            [start, end] => match (start.as_u64(), end.as_u64()) {
                (Some(start), Some(end)) => (start as usize, end as usize),
                _ => return Err(invalid_range("offsets must be non-negative integers")),
            },
            _ => return Err(invalid_range("expected exactly two offsets")),
        },
        None => return Err(TransformError::missing_field(POST, "display_text_range")),
    };

    let chars: Vec<char> = full_text.chars().collect();
    if start > end || end > chars.len() {
        return Err(invalid_range(format!(
            "[{}, {}] out of bounds for {} characters",
            start,
            end,
            chars.len()
        )));
    }

    let text: String = chars[start..end].iter().collect();
    let url: String = chars.get(end + 1..).map(|rest| rest.iter().collect()).unwrap_or_default();

    data.insert("text".to_string(), Value::String(text));
    data.insert("url".to_string(), Value::String(url.trim().to_string()));
    Ok(())
}

fn invalid_range(reason: impl ToString) -> TransformError {
    TransformError::invalid_value(POST, "display_text_range", reason)
}

/// Stores the author's follower count as the snapshot count
pub fn copy_followers_count(data: &mut FieldSet) -> Result<(), TransformError> {
    let count = data
        .get("followers_count")
        .cloned()
        .ok_or_else(|| TransformError::missing_field(FOLLOWER_SNAPSHOT, "followers_count"))?;
    data.insert("count".to_string(), count);
    Ok(())
}
