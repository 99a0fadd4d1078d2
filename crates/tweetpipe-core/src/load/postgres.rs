//! PostgreSQL entity store
//!
//! Every upsert is one statement: the payload is bound as JSONB, expanded into
//! the table's row type by `jsonb_populate_record` and inserted with
//! `ON CONFLICT (natural key) DO UPDATE`. `RETURNING (xmax = 0)` tells inserts
//! from updates.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, Row, Transaction};
use tracing::{debug, info, trace};

use super::store::{EntityStore, MaterializedInstance, StoreError, Upserted};
use crate::config::DatabaseConfig;
use crate::document::FieldSet;
use crate::schema::{EntitySchema, REFERENCE_FIELD};

/// SQLSTATE class of values that do not fit their column (bad casts, NUL in text)
const DATA_EXCEPTION_CLASS: &str = "22";

/// SQLSTATE class of constraint violations (not null, foreign key, unique, check)
const INTEGRITY_CLASS: &str = "23";

/// Create a connection pool from configuration
pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool, StoreError> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .connect(&config.url)
        .await?;

    info!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        "Database connection pool created"
    );

    Ok(pool)
}

/// Entity store writing to PostgreSQL
pub struct PgEntityStore {
    pool: PgPool,
    tx: Option<Transaction<'static, Postgres>>,
}

impl PgEntityStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool, tx: None }
    }

    /// Connects and applies pending migrations
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let store = Self::new(create_pool(config).await?);
        store.migrate().await?;
        Ok(store)
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        debug!("Database migrations applied");
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Builds the upsert statement for `entity`
///
/// `key` and `columns` come from validated schema identifiers.
fn upsert_sql(entity: &EntitySchema, key: &[&str], columns: &[&str]) -> String {
    let quote = |name: &&str| format!("\"{}\"", name);

    let all: Vec<String> = key.iter().chain(columns).map(quote).collect();
    let conflict: Vec<String> = key.iter().map(quote).collect();

    // an update is required for RETURNING to yield the existing row
    let updates: Vec<String> = if columns.is_empty() {
        key.iter()
            .take(1)
            .map(|name| format!("\"{0}\" = EXCLUDED.\"{0}\"", name))
            .collect()
    } else {
        columns
            .iter()
            .map(|name| format!("\"{0}\" = EXCLUDED.\"{0}\"", name))
            .collect()
    };

    format!(
        "INSERT INTO \"{table}\" ({all}) \
         SELECT {all} FROM jsonb_populate_record(NULL::\"{table}\", $1) \
         ON CONFLICT ({conflict}) DO UPDATE SET {updates} \
         RETURNING \"{reference}\" AS reference, (xmax = 0) AS inserted",
        table = entity.table(),
        all = all.join(", "),
        conflict = conflict.join(", "),
        updates = updates.join(", "),
        reference = REFERENCE_FIELD,
    )
}

/// Error caused by the record itself, or `None` when the store is at fault
fn record_error(entity: &str, code: &str, message: &str) -> Option<StoreError> {
    match code.get(..2) {
        Some(DATA_EXCEPTION_CLASS) => Some(StoreError::invalid_data(entity, message)),
        Some(INTEGRITY_CLASS) => Some(StoreError::integrity(entity, message)),
        _ => None,
    }
}

fn map_sqlx(entity: &EntitySchema, err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        if let Some(mapped) = db
            .code()
            .and_then(|code| record_error(entity.name(), &code, db.message()))
        {
            return mapped;
        }
    }
    StoreError::Database(err)
}

#[async_trait]
impl EntityStore for PgEntityStore {
    fn name(&self) -> &str {
        "postgres"
    }

    async fn begin(&mut self) -> Result<(), StoreError> {
        // a dangling transaction is rolled back on drop
        self.tx = Some(self.pool.begin().await?);
        Ok(())
    }

    async fn upsert(
        &mut self,
        entity: &EntitySchema,
        natural_key: FieldSet,
        fields: FieldSet,
    ) -> Result<Upserted, StoreError> {
        let key: Vec<String> = natural_key.keys().cloned().collect();
        let columns: Vec<String> = fields
            .keys()
            .filter(|name| !natural_key.contains_key(*name))
            .cloned()
            .collect();
        let key_refs: Vec<&str> = key.iter().map(String::as_str).collect();
        let column_refs: Vec<&str> = columns.iter().map(String::as_str).collect();
        let sql = upsert_sql(entity, &key_refs, &column_refs);
        trace!(entity = entity.name(), %sql, "Upserting");

        let mut payload = natural_key;
        payload.extend(fields);
        let query = sqlx::query(&sql).bind(Value::Object(payload));

        let row = match self.tx.as_mut() {
            Some(tx) => query.fetch_one(&mut **tx).await,
            None => query.fetch_one(&self.pool).await,
        }
        .map_err(|e| map_sqlx(entity, e))?;

        let reference: i64 = row.try_get("reference")?;
        let created: bool = row.try_get("inserted")?;

        Ok(Upserted {
            instance: MaterializedInstance {
                entity: entity.name().to_string(),
                reference: Value::from(reference),
            },
            created,
        })
    }

    async fn commit(&mut self) -> Result<(), StoreError> {
        if let Some(tx) = self.tx.take() {
            tx.commit().await?;
        }
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), StoreError> {
        if let Some(tx) = self.tx.take() {
            tx.rollback().await?;
        }
        Ok(())
    }
}
