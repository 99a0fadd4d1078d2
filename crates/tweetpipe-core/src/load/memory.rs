//! In-memory entity store
//!
//! Mirrors the constraints of the PostgreSQL schema: foreign keys must be set
//! and point at an existing row, `id` values are unique and natural keys
//! identify rows. Rows without an `id` get a serial one. Used for dry runs and
//! tests.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;
use tracing::trace;

use super::store::{EntityStore, MaterializedInstance, StoreError, Upserted};
use crate::document::FieldSet;
use crate::schema::{EntitySchema, REFERENCE_FIELD};

#[derive(Debug, Clone, Default)]
struct Table {
    rows: Vec<FieldSet>,
    next_id: i64,
}

impl Table {
    fn position(&self, key: &FieldSet) -> Option<usize> {
        self.rows
            .iter()
            .position(|row| key.iter().all(|(field, value)| row.get(field) == Some(value)))
    }

    fn id_taken(&self, id: &Value, except: Option<usize>) -> bool {
        self.rows
            .iter()
            .enumerate()
            .any(|(position, row)| Some(position) != except && row.get(REFERENCE_FIELD) == Some(id))
    }

    fn contains_id(&self, id: &Value) -> bool {
        self.id_taken(id, None)
    }

    fn next_serial(&mut self) -> Value {
        loop {
            self.next_id += 1;
            let candidate = Value::from(self.next_id);
            if !self.contains_id(&candidate) {
                return candidate;
            }
        }
    }
}

/// Entity store backed by plain maps
#[derive(Debug, Clone, Default)]
pub struct MemoryEntityStore {
    tables: BTreeMap<String, Table>,
    snapshot: Option<BTreeMap<String, Table>>,
}

impl MemoryEntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows of `entity` in insertion order
    pub fn rows(&self, entity: &str) -> &[FieldSet] {
        self.tables
            .get(entity)
            .map(|table| table.rows.as_slice())
            .unwrap_or_default()
    }

    pub fn count(&self, entity: &str) -> usize {
        self.rows(entity).len()
    }

    /// Row of `entity` whose `id` equals `id`
    pub fn find(&self, entity: &str, id: &Value) -> Option<&FieldSet> {
        self.rows(entity)
            .iter()
            .find(|row| row.get(REFERENCE_FIELD) == Some(id))
    }

    /// Row counts per entity
    pub fn counts(&self) -> BTreeMap<String, usize> {
        self.tables
            .iter()
            .map(|(entity, table)| (entity.clone(), table.rows.len()))
            .collect()
    }

    fn check_foreign_keys(&self, entity: &EntitySchema, row: &FieldSet) -> Result<(), StoreError> {
        for fk in entity.foreign_keys() {
            let value = match row.get(&fk.field) {
                Some(value) if !value.is_null() => value,
                _ => {
                    return Err(StoreError::integrity(
                        entity.name(),
                        format!("'{}' must reference a {}", fk.field, fk.references),
                    ))
                }
            };

            let exists = self
                .tables
                .get(&fk.references)
                .is_some_and(|table| table.contains_id(value));
            if !exists {
                return Err(StoreError::integrity(
                    entity.name(),
                    format!("'{}' references missing {} {}", fk.field, fk.references, value),
                ));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl EntityStore for MemoryEntityStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn begin(&mut self) -> Result<(), StoreError> {
        self.snapshot = Some(self.tables.clone());
        Ok(())
    }

    async fn upsert(
        &mut self,
        entity: &EntitySchema,
        natural_key: FieldSet,
        fields: FieldSet,
    ) -> Result<Upserted, StoreError> {
        let mut candidate = natural_key.clone();
        candidate.extend(fields.clone());
        self.check_foreign_keys(entity, &candidate)?;

        let table = self.tables.entry(entity.name().to_string()).or_default();
        let existing = table.position(&natural_key);

        if let Some(id) = candidate.get(REFERENCE_FIELD) {
            if table.id_taken(id, existing) {
                return Err(StoreError::integrity(
                    entity.name(),
                    format!("duplicate {} {}", REFERENCE_FIELD, id),
                ));
            }
        }

        let (position, created) = match existing {
            Some(position) => {
                table.rows[position].extend(fields);
                (position, false)
            }
            None => {
                if !candidate.contains_key(REFERENCE_FIELD) {
                    let id = table.next_serial();
                    candidate.insert(REFERENCE_FIELD.to_string(), id);
                }
                table.rows.push(candidate);
                (table.rows.len() - 1, true)
            }
        };

        let reference = table.rows[position]
            .get(REFERENCE_FIELD)
            .cloned()
            .unwrap_or(Value::Null);
        trace!(entity = entity.name(), %reference, created, "Upserted into memory");

        Ok(Upserted {
            instance: MaterializedInstance {
                entity: entity.name().to_string(),
                reference,
            },
            created,
        })
    }

    async fn commit(&mut self) -> Result<(), StoreError> {
        self.snapshot = None;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), StoreError> {
        if let Some(snapshot) = self.snapshot.take() {
            self.tables = snapshot;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn set(value: Value) -> FieldSet {
        value.as_object().cloned().unwrap()
    }

    fn author() -> EntitySchema {
        EntitySchema::new("author").with_fields(["id", "name"])
    }

    fn snapshot() -> EntitySchema {
        EntitySchema::new("snapshot")
            .with_fields(["author", "count", "fetched_at"])
            .with_natural_key(["author", "fetched_at"])
            .with_foreign_key("author", "author")
    }

    #[tokio::test]
    async fn test_create_then_update() {
        let mut store = MemoryEntityStore::new();

        let first = store
            .upsert(&author(), set(json!({"id": 9})), set(json!({"name": "a"})))
            .await
            .unwrap();
        assert!(first.created);
        assert_eq!(first.instance.reference, json!(9));

        let second = store
            .upsert(&author(), set(json!({"id": 9})), set(json!({"name": "b"})))
            .await
            .unwrap();
        assert!(!second.created);
        assert_eq!(store.count("author"), 1);
        assert_eq!(store.rows("author")[0]["name"], "b");
    }

    #[tokio::test]
    async fn test_serial_id_for_rows_without_id() {
        let mut store = MemoryEntityStore::new();
        store
            .upsert(&author(), set(json!({"id": 9})), FieldSet::new())
            .await
            .unwrap();

        let first = store
            .upsert(
                &snapshot(),
                set(json!({"author": 9, "fetched_at": "t1"})),
                set(json!({"count": 1})),
            )
            .await
            .unwrap();
        let second = store
            .upsert(
                &snapshot(),
                set(json!({"author": 9, "fetched_at": "t2"})),
                set(json!({"count": 2})),
            )
            .await
            .unwrap();

        assert_eq!(first.instance.reference, json!(1));
        assert_eq!(second.instance.reference, json!(2));
        assert_eq!(store.find("snapshot", &json!(2)).unwrap()["count"], 2);
    }

    #[tokio::test]
    async fn test_foreign_key_must_exist() {
        let mut store = MemoryEntityStore::new();

        let err = store
            .upsert(
                &snapshot(),
                set(json!({"author": 1, "fetched_at": "t"})),
                FieldSet::new(),
            )
            .await
            .unwrap_err();
        assert!(err.is_record_local());
        assert_eq!(store.count("snapshot"), 0);
    }

    #[tokio::test]
    async fn test_rollback_restores_snapshot() {
        let mut store = MemoryEntityStore::new();
        store.begin().await.unwrap();
        store
            .upsert(&author(), set(json!({"id": 1})), FieldSet::new())
            .await
            .unwrap();
        store.commit().await.unwrap();

        store.begin().await.unwrap();
        store
            .upsert(&author(), set(json!({"id": 2})), FieldSet::new())
            .await
            .unwrap();
        store
            .upsert(&author(), set(json!({"id": 1})), set(json!({"name": "changed"})))
            .await
            .unwrap();
        store.rollback().await.unwrap();

        assert_eq!(store.count("author"), 1);
        assert!(!store.rows("author")[0].contains_key("name"));
    }

    #[tokio::test]
    async fn test_duplicate_id_rejected() {
        let keyed_by_name = EntitySchema::new("author")
            .with_fields(["id", "name"])
            .with_natural_key(["name"]);
        let mut store = MemoryEntityStore::new();

        store
            .upsert(&keyed_by_name, set(json!({"name": "a"})), set(json!({"id": 1})))
            .await
            .unwrap();
        let err = store
            .upsert(&keyed_by_name, set(json!({"name": "b"})), set(json!({"id": 1})))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::ReferentialIntegrity { .. }));
    }
}
