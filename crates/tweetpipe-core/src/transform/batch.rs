//! Fans a raw batch out to every registered record parser

use serde_json::Value;
use tracing::debug;

use super::record::RecordParser;
use crate::document::{FieldSet, MultiEntityRecord, RawDocument, ITEMS_KEY};
use crate::error::{ConfigurationError, ItemError, TransformError};
use crate::schema::EntityRegistry;

/// Runs all record parsers over every item of a raw document
#[derive(Debug, Clone)]
pub struct BatchParser {
    parsers: Vec<RecordParser>,
    items_key: String,
}

impl BatchParser {
    /// Every parser must target an entity known to `registry`
    pub fn new(registry: &EntityRegistry, parsers: Vec<RecordParser>) -> Result<Self, ConfigurationError> {
        if parsers.is_empty() {
            return Err(ConfigurationError::NoParsers);
        }

        for parser in &parsers {
            let entity = parser.entity().name();
            match registry.get(entity) {
                Some(registered) if registered.as_ref() == parser.entity() => {}
                _ => return Err(ConfigurationError::UnknownEntity(entity.to_string())),
            }
        }

        Ok(Self {
            parsers,
            items_key: ITEMS_KEY.to_string(),
        })
    }

    /// Reads items from `key` instead of the default item key
    pub fn with_items_key(mut self, key: impl Into<String>) -> Self {
        self.items_key = key.into();
        self
    }

    pub fn items_key(&self) -> &str {
        &self.items_key
    }

    pub fn parsers(&self) -> &[RecordParser] {
        &self.parsers
    }

    /// Splits `document` into items and returns a lazy iterator of records
    ///
    /// Fails only when the item list itself is missing or not a list. Item
    /// level failures are yielded in place of the item's record.
    pub fn process(&self, document: RawDocument) -> Result<ParsedItems<'_>, TransformError> {
        let (items, metadata) = document.into_parts(&self.items_key)?;
        debug!(
            items = items.len(),
            metadata_keys = metadata.len(),
            parsers = self.parsers.len(),
            "Processing batch"
        );

        Ok(ParsedItems {
            parser: self,
            metadata,
            items: items.into_iter().enumerate(),
        })
    }

    /// Parses one item against the shared metadata
    pub fn parse_item(&self, index: usize, item: Value, metadata: &FieldSet) -> Result<MultiEntityRecord, ItemError> {
        let Value::Object(mut view) = item else {
            return Err(ItemError {
                index,
                parser: None,
                source: TransformError::NotAMapping {
                    path: format!("{}[{}]", self.items_key, index),
                },
            });
        };

        // metadata wins over item keys of the same name
        for (key, value) in metadata {
            view.insert(key.clone(), value.clone());
        }

        let mut record = MultiEntityRecord::new(index);
        for parser in &self.parsers {
            let parsed = parser.parse(&view).map_err(|source| ItemError {
                index,
                parser: Some(parser.name().to_string()),
                source,
            })?;
            record.merge(parsed);
        }
        Ok(record)
    }
}

/// Lazy single-pass iterator over the records of one batch
#[derive(Debug)]
pub struct ParsedItems<'a> {
    parser: &'a BatchParser,
    metadata: FieldSet,
    items: std::iter::Enumerate<std::vec::IntoIter<Value>>,
}

impl Iterator for ParsedItems<'_> {
    type Item = Result<MultiEntityRecord, ItemError>;

    fn next(&mut self) -> Option<Self::Item> {
        let (index, item) = self.items.next()?;
        Some(self.parser.parse_item(index, item, &self.metadata))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.items.size_hint()
    }
}

impl ExactSizeIterator for ParsedItems<'_> {}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::document::EntityData;
    use crate::schema::EntitySchema;
    use serde_json::json;

    fn registry() -> EntityRegistry {
        EntityRegistry::new(vec![
            EntitySchema::new("author").with_fields(["id", "username"]),
            EntitySchema::new("post")
                .with_fields(["id", "author"])
                .with_foreign_key("author", "author"),
        ])
        .unwrap()
    }

    fn parsers(registry: &EntityRegistry) -> Vec<RecordParser> {
        vec![
            RecordParser::builder("author")
                .entity(registry.require("author").unwrap())
                .fields(["tweetpipe_metadata.*", "user.*"])
                .build()
                .unwrap(),
            RecordParser::builder("post")
                .entity(registry.require("post").unwrap())
                .fields(["id"])
                .build()
                .unwrap(),
        ]
    }

    fn document(value: serde_json::Value) -> RawDocument {
        RawDocument::from_map(value.as_object().cloned().unwrap())
    }

    #[test]
    fn test_rejects_empty_parser_list() {
        assert_eq!(
            BatchParser::new(&registry(), vec![]).unwrap_err(),
            ConfigurationError::NoParsers
        );
    }

    #[test]
    fn test_rejects_unregistered_entity() {
        let registry = registry();
        let stray = RecordParser::builder("tag")
            .entity(Arc::new(EntitySchema::new("tag").with_fields(["text"])))
            .fields(["*"])
            .build()
            .unwrap();

        assert_eq!(
            BatchParser::new(&registry, vec![stray]).unwrap_err(),
            ConfigurationError::UnknownEntity("tag".into())
        );
    }

    #[test]
    fn test_one_record_per_item_in_order() {
        let registry = registry();
        let batch = BatchParser::new(&registry, parsers(&registry)).unwrap();
        let doc = document(json!({
            "tweetpipe_metadata": {"username": "alice"},
            "tweets": [
                {"id": 1, "user": {"id": 9}},
                {"id": 2, "user": {"id": 9}}
            ]
        }));

        let records: Vec<_> = batch.process(doc).unwrap().collect();
        assert_eq!(records.len(), 2);

        let first = records[0].as_ref().unwrap();
        assert_eq!(first.index, 0);
        assert_eq!(
            first.get("author"),
            Some(&EntityData::One(
                json!({"id": 9, "username": "alice"}).as_object().cloned().unwrap()
            ))
        );
        assert_eq!(records[1].as_ref().unwrap().get("post").unwrap().first().unwrap()["id"], 2);
    }

    #[test]
    fn test_failing_item_does_not_stop_batch() {
        let registry = registry();
        let batch = BatchParser::new(&registry, parsers(&registry)).unwrap();
        let doc = document(json!({
            "tweetpipe_metadata": {"username": "alice"},
            "tweets": [
                {"id": 1},
                "not a mapping",
                {"id": 3, "user": {"id": 9}}
            ]
        }));

        let records: Vec<_> = batch.process(doc).unwrap().collect();
        assert_eq!(records.len(), 3);

        let err = records[0].as_ref().unwrap_err();
        assert_eq!(err.index, 0);
        assert_eq!(err.parser.as_deref(), Some("author"));
        assert!(matches!(err.source, TransformError::PathNotFound { .. }));

        let err = records[1].as_ref().unwrap_err();
        assert!(matches!(err.source, TransformError::NotAMapping { .. }));
        assert!(records[2].is_ok());
    }

    #[test]
    fn test_missing_items_key() {
        let registry = registry();
        let batch = BatchParser::new(&registry, parsers(&registry)).unwrap();
        assert!(matches!(
            batch.process(document(json!({"statuses": []}))),
            Err(TransformError::PathNotFound { .. })
        ));

        let batch = batch.with_items_key("statuses");
        assert_eq!(batch.process(document(json!({"statuses": []}))).unwrap().len(), 0);
    }

    #[test]
    fn test_metadata_overrides_item_keys() {
        let registry = registry();
        let batch = BatchParser::new(&registry, parsers(&registry)).unwrap();
        let metadata = json!({"id": 99, "tweetpipe_metadata": {}}).as_object().cloned().unwrap();

        let record = batch
            .parse_item(0, json!({"id": 1, "user": {"id": 9}}), &metadata)
            .unwrap();
        assert_eq!(record.get("post").unwrap().first().unwrap()["id"], 99);
    }
}
