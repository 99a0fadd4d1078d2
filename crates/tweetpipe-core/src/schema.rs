//! Entity declarations and load order
//!
//! An [`EntitySchema`] names a target table, the fields persisted into it, the
//! natural key used for upserts and the foreign keys pointing at other
//! entities. The [`EntityRegistry`] holds the schemas in load order and
//! rejects orders in which a dependent would be loaded before its dependency.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use crate::document::FieldSet;
use crate::error::ConfigurationError;

/// Field that carries the store-assigned reference of every entity
pub const REFERENCE_FIELD: &str = "id";

/// `field` stores the reference of an instance of `references`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    pub field: String,
    pub references: String,
}

/// Declaration of one target entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntitySchema {
    name: String,
    table: String,
    fields: BTreeSet<String>,
    natural_key: Option<Vec<String>>,
    foreign_keys: Vec<ForeignKey>,
}

impl EntitySchema {
    /// New schema whose table name equals the entity name
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            table: name.clone(),
            name,
            fields: BTreeSet::new(),
            natural_key: None,
            foreign_keys: Vec::new(),
        }
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields.extend(fields.into_iter().map(Into::into));
        self
    }

    /// Natural key used to find an existing instance (defaults to `id`)
    pub fn with_natural_key<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.natural_key = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_foreign_key(mut self, field: impl Into<String>, references: impl Into<String>) -> Self {
        self.foreign_keys.push(ForeignKey {
            field: field.into(),
            references: references.into(),
        });
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(String::as_str)
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.fields.contains(field)
    }

    pub fn natural_key(&self) -> Vec<&str> {
        match &self.natural_key {
            Some(fields) if !fields.is_empty() => fields.iter().map(String::as_str).collect(),
            _ => vec![REFERENCE_FIELD],
        }
    }

    pub fn foreign_keys(&self) -> &[ForeignKey] {
        &self.foreign_keys
    }

    /// Keeps only the persisted fields
    pub fn filter(&self, mut fields: FieldSet) -> FieldSet {
        fields.retain(|key, _| self.fields.contains(key));
        fields
    }

    fn validate(&self) -> Result<(), ConfigurationError> {
        for identifier in [&self.name, &self.table].into_iter().chain(self.fields.iter()) {
            if !is_identifier(identifier) {
                return Err(ConfigurationError::InvalidIdentifier(identifier.clone()));
            }
        }

        let declared = self
            .natural_key()
            .into_iter()
            .chain(self.foreign_keys.iter().map(|fk| fk.field.as_str()));
        for field in declared {
            if !self.has_field(field) {
                return Err(ConfigurationError::UndeclaredField {
                    entity: self.name.clone(),
                    field: field.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Schema names end up quoted in SQL, keep them boring
fn is_identifier(value: &str) -> bool {
    let mut chars = value.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_lowercase() || c == '_')
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

/// Registered entities in load order
#[derive(Debug, Clone)]
pub struct EntityRegistry {
    entities: Vec<Arc<EntitySchema>>,
}

impl EntityRegistry {
    /// Validates and registers `entities`; their order is the load order
    pub fn new(entities: Vec<EntitySchema>) -> Result<Self, ConfigurationError> {
        let mut seen: HashSet<String> = HashSet::new();

        for entity in &entities {
            entity.validate()?;

            for fk in entity.foreign_keys() {
                if !seen.contains(&fk.references) {
                    return Err(ConfigurationError::ForeignKeyOrder {
                        entity: entity.name().to_string(),
                        references: fk.references.clone(),
                    });
                }
            }

            if !seen.insert(entity.name().to_string()) {
                return Err(ConfigurationError::DuplicateEntity(entity.name().to_string()));
            }
        }

        Ok(Self {
            entities: entities.into_iter().map(Arc::new).collect(),
        })
    }

    pub fn get(&self, name: &str) -> Option<&Arc<EntitySchema>> {
        self.entities.iter().find(|entity| entity.name() == name)
    }

    /// Like [`get`](Self::get) but a missing entity is a configuration error
    pub fn require(&self, name: &str) -> Result<Arc<EntitySchema>, ConfigurationError> {
        self.get(name)
            .cloned()
            .ok_or_else(|| ConfigurationError::UnknownEntity(name.to_string()))
    }

    /// Schemas in load order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<EntitySchema>> {
        self.entities.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.entities.iter().map(|entity| entity.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn author() -> EntitySchema {
        EntitySchema::new("author").with_fields(["id", "name"])
    }

    fn post() -> EntitySchema {
        EntitySchema::new("post")
            .with_fields(["id", "author", "text"])
            .with_foreign_key("author", "author")
    }

    #[test]
    fn test_natural_key_defaults_to_id() {
        assert_eq!(author().natural_key(), vec!["id"]);

        let snapshot = EntitySchema::new("snapshot")
            .with_fields(["author", "fetched_at"])
            .with_natural_key(["author", "fetched_at"]);
        assert_eq!(snapshot.natural_key(), vec!["author", "fetched_at"]);
    }

    #[test]
    fn test_filter_keeps_declared_fields() {
        let fields = json!({"id": 1, "name": "a", "extra": true})
            .as_object()
            .cloned()
            .unwrap();
        let filtered = author().filter(fields);
        assert_eq!(filtered.len(), 2);
        assert!(!filtered.contains_key("extra"));
    }

    #[test]
    fn test_registry_load_order() {
        let registry = EntityRegistry::new(vec![author(), post()]).unwrap();
        assert_eq!(registry.names(), vec!["author", "post"]);
        assert!(registry.get("post").is_some());
        assert!(registry.require("hashtag").is_err());
    }

    #[test]
    fn test_registry_rejects_dependent_first() {
        let err = EntityRegistry::new(vec![post(), author()]).unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::ForeignKeyOrder {
                entity: "post".into(),
                references: "author".into()
            }
        );
    }

    #[test]
    fn test_registry_rejects_self_reference() {
        let reply = EntitySchema::new("reply")
            .with_fields(["id", "parent"])
            .with_foreign_key("parent", "reply");
        assert!(matches!(
            EntityRegistry::new(vec![reply]),
            Err(ConfigurationError::ForeignKeyOrder { .. })
        ));
    }

    #[test]
    fn test_registry_rejects_duplicates() {
        assert_eq!(
            EntityRegistry::new(vec![author(), author()]).unwrap_err(),
            ConfigurationError::DuplicateEntity("author".into())
        );
    }

    #[test]
    fn test_registry_rejects_undeclared_key() {
        let broken = EntitySchema::new("broken")
            .with_fields(["name"])
            .with_natural_key(["slug"]);
        assert!(matches!(
            EntityRegistry::new(vec![broken]),
            Err(ConfigurationError::UndeclaredField { field, .. }) if field == "slug"
        ));
    }

    #[test]
    fn test_registry_rejects_bad_identifier() {
        let broken = EntitySchema::new("author").with_fields(["id", "name\"; drop"]);
        assert!(matches!(
            EntityRegistry::new(vec![broken]),
            Err(ConfigurationError::InvalidIdentifier(_))
        ));
    }
}
