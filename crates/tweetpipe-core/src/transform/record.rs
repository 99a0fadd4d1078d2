//! Declarative single-entity parser
//!
//! A [`RecordParser`] turns one (merged) item document into the payload of one
//! entity. It runs a fixed sequence of stages, each completing before the next:
//!
//! 1. pre-filter the document with the field spec (see [`crate::field_path`])
//! 2. for one-to-many entities, split the list field into one working record
//!    per element
//! 3. per-field transforms
//! 4. whole-record transforms
//! 5. post-filter to the fields the entity persists
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use serde_json::json;
//! use tweetpipe_core::{EntityData, EntitySchema, RecordParser};
//!
//! let author = Arc::new(EntitySchema::new("author").with_fields(["id", "name"]));
//! let parser = RecordParser::builder("author")
//!     .entity(author)
//!     .fields(["user.*"])
//!     .build()
//!     .unwrap();
//!
//! let item = json!({"id": 1, "user": {"id": 9, "name": "Alice", "lang": "en"}});
//! let parsed = parser.parse(item.as_object().unwrap()).unwrap();
//! let EntityData::One(fields) = parsed.data else { unreachable!() };
//! assert_eq!(fields.len(), 2);
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::{trace, warn};

use crate::document::{EntityData, FieldSet, ParsedRecord};
use crate::error::{ConfigurationError, TransformError, ValueError};
use crate::field_path;
use crate::schema::EntitySchema;

/// Replaces one field value
pub type FieldTransform = fn(Value) -> Result<Value, ValueError>;

/// Reads and writes arbitrary fields of the working record in place
pub type RecordTransform = fn(&mut FieldSet) -> Result<(), TransformError>;

/// Transforms applied after the pre-filter
///
/// Per-field transforms run before record transforms. Transforms within one
/// group must not depend on each other.
#[derive(Debug, Clone, Default)]
pub struct TransformSpec {
    field_transforms: BTreeMap<String, FieldRule>,
    record_transforms: Vec<RecordTransform>,
}

/// A field transform and whether its field must be present
#[derive(Debug, Clone, Copy)]
struct FieldRule {
    transform: FieldTransform,
    required: bool,
}

impl TransformSpec {
    pub fn is_empty(&self) -> bool {
        self.field_transforms.is_empty() && self.record_transforms.is_empty()
    }

    pub fn has_field_transform(&self, field: &str) -> bool {
        self.field_transforms.contains_key(field)
    }
}

/// How many entity instances one document yields
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Cardinality {
    #[default]
    One,
    /// One instance per element of the list stored under `from`
    Many { from: String },
}

/// Parses one document into one entity payload
#[derive(Debug, Clone)]
pub struct RecordParser {
    name: String,
    entity: Arc<EntitySchema>,
    field_spec: Vec<String>,
    transforms: TransformSpec,
    cardinality: Cardinality,
}

impl RecordParser {
    pub fn builder(name: impl Into<String>) -> RecordParserBuilder {
        RecordParserBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entity(&self) -> &EntitySchema {
        &self.entity
    }

    pub fn field_spec(&self) -> &[String] {
        &self.field_spec
    }

    pub fn cardinality(&self) -> &Cardinality {
        &self.cardinality
    }

    /// Runs the full stage sequence on `document`
    pub fn parse(&self, document: &FieldSet) -> Result<ParsedRecord, TransformError> {
        let data = field_path::resolve(document, &self.field_spec)?;

        let data = match &self.cardinality {
            Cardinality::One => EntityData::One(self.finish(data)?),
            Cardinality::Many { from } => EntityData::Many(self.split(data, from)?),
        };

        trace!(parser = %self.name, instances = data.len(), "Parsed record");

        Ok(ParsedRecord {
            entity: self.entity.name().to_string(),
            data,
        })
    }

    fn split(&self, mut shared: FieldSet, from: &str) -> Result<Vec<FieldSet>, TransformError> {
        let elements = match shared.remove(from) {
            Some(Value::Array(elements)) => elements,
            Some(_) => {
                return Err(TransformError::NotAList {
                    field: from.to_string(),
                })
            }
            None => return Err(TransformError::missing_field(self.entity.name(), from)),
        };

        elements
            .into_iter()
            .enumerate()
            .map(|(position, element)| match element {
                Value::Object(fields) => {
                    let mut working = shared.clone();
                    working.extend(fields);
                    self.finish(working)
                }
                _ => Err(TransformError::NotAMapping {
                    path: format!("{}[{}]", from, position),
                }),
            })
            .collect()
    }

    fn finish(&self, mut data: FieldSet) -> Result<FieldSet, TransformError> {
        for (field, rule) in &self.transforms.field_transforms {
            let Some(value) = data.remove(field) else {
                if rule.required {
                    return Err(TransformError::missing_field(self.entity.name(), field));
                }
                continue;
            };
            let value = (rule.transform)(value)
                .map_err(|e| TransformError::invalid_value(self.entity.name(), field, e))?;
            data.insert(field.clone(), value);
        }

        for transform in &self.transforms.record_transforms {
            transform(&mut data)?;
        }

        Ok(self.entity.filter(data))
    }
}

/// Builder for [`RecordParser`], validated in [`build`](Self::build)
#[derive(Debug, Clone)]
pub struct RecordParserBuilder {
    name: String,
    entity: Option<Arc<EntitySchema>>,
    field_spec: Option<Vec<String>>,
    prefix: Vec<String>,
    transforms: TransformSpec,
    cardinality: Cardinality,
}

impl RecordParserBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entity: None,
            field_spec: None,
            prefix: Vec::new(),
            transforms: TransformSpec::default(),
            cardinality: Cardinality::One,
        }
    }

    pub fn entity(mut self, entity: Arc<EntitySchema>) -> Self {
        self.entity = Some(entity);
        self
    }

    /// Sets the field spec; an empty list passes the document through
    pub fn fields<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.field_spec = Some(paths.into_iter().map(Into::into).collect());
        self
    }

    /// Paths placed before the field spec, so the spec overrides them
    pub fn prepend_fields<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut prefix: Vec<String> = paths.into_iter().map(Into::into).collect();
        prefix.append(&mut self.prefix);
        self.prefix = prefix;
        self
    }

    /// Transform for a field the document must contain
    pub fn field_transform(mut self, field: impl Into<String>, transform: FieldTransform) -> Self {
        let rule = FieldRule {
            transform,
            required: true,
        };
        self.transforms.field_transforms.insert(field.into(), rule);
        self
    }

    /// Transform applied only when the field is present
    pub fn optional_field_transform(mut self, field: impl Into<String>, transform: FieldTransform) -> Self {
        let rule = FieldRule {
            transform,
            required: false,
        };
        self.transforms.field_transforms.insert(field.into(), rule);
        self
    }

    /// Adds an optional field transform unless one is already declared for `field`
    pub fn default_field_transform(mut self, field: impl Into<String>, transform: FieldTransform) -> Self {
        self.transforms
            .field_transforms
            .entry(field.into())
            .or_insert(FieldRule {
                transform,
                required: false,
            });
        self
    }

    pub fn record_transform(mut self, transform: RecordTransform) -> Self {
        self.transforms.record_transforms.push(transform);
        self
    }

    /// One instance per element of the list field `from`
    pub fn many(mut self, from: impl Into<String>) -> Self {
        self.cardinality = Cardinality::Many { from: from.into() };
        self
    }

    pub fn build(self) -> Result<RecordParser, ConfigurationError> {
        let entity = self
            .entity
            .ok_or_else(|| ConfigurationError::MissingEntity {
                parser: self.name.clone(),
            })?;

        let spec = self
            .field_spec
            .ok_or_else(|| ConfigurationError::MissingFieldSpec {
                parser: self.name.clone(),
            })?;

        if self.transforms.is_empty() {
            warn!(
                parser = %self.name,
                entity = entity.name(),
                "No transforms declared, fields are passed through as selected"
            );
        }

        let mut field_spec = self.prefix;
        field_spec.extend(spec);

        Ok(RecordParser {
            name: self.name,
            entity,
            field_spec,
            transforms: self.transforms,
            cardinality: self.cardinality,
        })
    }
}
