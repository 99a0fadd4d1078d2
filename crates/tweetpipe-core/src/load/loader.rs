//! Dependency-aware loading of parsed records
//!
//! Entities are persisted in registry order. Every persisted instance is kept
//! for the rest of the record so later entities can have their foreign keys
//! filled with its reference. Each record runs in its own store transaction.

use std::collections::HashMap;
use std::fmt;

use tracing::{debug, error, info, warn};

use super::store::{EntityStore, MaterializedInstance, Upserted};
use super::LoadError;
use crate::document::{FieldSet, MultiEntityRecord};
use crate::error::ItemError;
use crate::schema::{EntityRegistry, EntitySchema};

/// Entity counts for one loaded record
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordOutcome {
    pub created: usize,
    pub updated: usize,
    /// Entities dropped because their natural key was incomplete
    pub skipped: usize,
}

/// Statistics for one batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadStats {
    pub records_total: usize,
    pub records_loaded: usize,
    /// Records that failed to parse
    pub records_failed: usize,
    /// Records rolled back on an integrity violation
    pub records_skipped: usize,
    pub entities_created: usize,
    pub entities_updated: usize,
    pub entities_skipped: usize,
}

impl LoadStats {
    fn absorb(&mut self, outcome: RecordOutcome) {
        self.records_loaded += 1;
        self.entities_created += outcome.created;
        self.entities_updated += outcome.updated;
        self.entities_skipped += outcome.skipped;
    }

    /// Whether at least one record was dropped
    pub fn has_failures(&self) -> bool {
        self.records_failed > 0 || self.records_skipped > 0
    }

    pub fn summary(&self) -> String {
        format!(
            "{} records: {} loaded, {} failed to parse, {} skipped; entities: {} created, {} updated, {} skipped",
            self.records_total,
            self.records_loaded,
            self.records_failed,
            self.records_skipped,
            self.entities_created,
            self.entities_updated,
            self.entities_skipped
        )
    }
}

impl fmt::Display for LoadStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}

/// Persists records through an [`EntityStore`]
pub struct Loader<'a, S: EntityStore + ?Sized> {
    registry: &'a EntityRegistry,
    store: &'a mut S,
}

impl<'a, S: EntityStore + ?Sized> Loader<'a, S> {
    pub fn new(registry: &'a EntityRegistry, store: &'a mut S) -> Self {
        Self { registry, store }
    }

    /// Loads every parsed record, dropping the ones that cannot be loaded
    ///
    /// Parse failures and integrity violations are logged and counted. A
    /// backend failure of the store aborts the batch.
    pub async fn load_all<I>(&mut self, records: I) -> Result<LoadStats, LoadError>
    where
        I: IntoIterator<Item = Result<MultiEntityRecord, ItemError>>,
    {
        let mut stats = LoadStats::default();

        for record in records {
            stats.records_total += 1;

            let record = match record {
                Ok(record) => record,
                Err(e) => {
                    error!(
                        index = e.index,
                        parser = e.parser.as_deref().unwrap_or("-"),
                        error = %e.source,
                        "Dropping item that failed to parse"
                    );
                    stats.records_failed += 1;
                    continue;
                }
            };

            let index = record.index;
            match self.load_record(record).await {
                Ok(outcome) => stats.absorb(outcome),
                Err(e) if e.is_record_local() => {
                    error!(index, error = %e, "Record rolled back");
                    stats.records_skipped += 1;
                }
                Err(e) => {
                    error!(index, error = %e, store = self.store.name(), "Entity store failed");
                    return Err(e);
                }
            }
        }

        info!(
            records = stats.records_total,
            loaded = stats.records_loaded,
            failed = stats.records_failed,
            skipped = stats.records_skipped,
            created = stats.entities_created,
            updated = stats.entities_updated,
            "Batch loaded"
        );

        Ok(stats)
    }

    /// Loads one record inside one store transaction
    pub async fn load_record(&mut self, record: MultiEntityRecord) -> Result<RecordOutcome, LoadError> {
        self.store.begin().await?;

        match self.load_entities(record).await {
            Ok(outcome) => {
                self.store.commit().await?;
                Ok(outcome)
            }
            Err(e) => {
                if let Err(rollback_err) = self.store.rollback().await {
                    warn!(error = %rollback_err, "Rollback failed");
                }
                Err(e)
            }
        }
    }

    async fn load_entities(&mut self, mut record: MultiEntityRecord) -> Result<RecordOutcome, LoadError> {
        let registry = self.registry;
        let mut instances: HashMap<String, MaterializedInstance> = HashMap::new();
        let mut outcome = RecordOutcome::default();

        for schema in registry.iter() {
            let Some(data) = record.take(schema.name()) else {
                debug!(index = record.index, entity = schema.name(), "No data for entity");
                continue;
            };

            for fields in data.into_vec() {
                match self.load_entity(schema, fields, &instances).await {
                    Ok(upserted) => {
                        if upserted.created {
                            outcome.created += 1;
                        } else {
                            outcome.updated += 1;
                        }
                        instances.insert(schema.name().to_string(), upserted.instance);
                    }
                    Err(LoadError::MissingNaturalKey { entity, field }) => {
                        warn!(
                            index = record.index,
                            entity = %entity,
                            field = %field,
                            "Skipping entity without natural key"
                        );
                        outcome.skipped += 1;
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        Ok(outcome)
    }

    async fn load_entity(
        &mut self,
        schema: &EntitySchema,
        mut fields: FieldSet,
        instances: &HashMap<String, MaterializedInstance>,
    ) -> Result<Upserted, LoadError> {
        for fk in schema.foreign_keys() {
            if let Some(instance) = instances.get(&fk.references) {
                fields.insert(fk.field.clone(), instance.reference.clone());
            }
        }

        let mut fields = schema.filter(fields);

        let mut natural_key = FieldSet::new();
        for name in schema.natural_key() {
            match fields.remove(name) {
                Some(value) if !value.is_null() => {
                    natural_key.insert(name.to_string(), value);
                }
                _ => {
                    return Err(LoadError::MissingNaturalKey {
                        entity: schema.name().to_string(),
                        field: name.to_string(),
                    })
                }
            }
        }

        let upserted = self.store.upsert(schema, natural_key, fields).await?;
        debug!(
            entity = schema.name(),
            reference = %upserted.instance.reference,
            created = upserted.created,
            "Upserted entity"
        );
        Ok(upserted)
    }
}
