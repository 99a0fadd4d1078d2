//! Timeline ingestion pipeline
//!
//! Orchestrates extract, raw storage, transform and load. Stages run strictly
//! one after the other.

use anyhow::{Context, Result};
use tracing::info;

use crate::document::RawDocument;
use crate::error::ConfigurationError;
use crate::extract::TwitterClient;
use crate::load::{EntityStore, LoadError, LoadStats, Loader};
use crate::raw_store::{Listing, RawStore};
use crate::schema::EntityRegistry;
use crate::transform::{tweets, BatchParser, RecordParser};

/// Transform and load configuration for one entity set
pub struct TweetPipeline {
    registry: EntityRegistry,
    parser: BatchParser,
}

impl TweetPipeline {
    /// Pipeline for the full timeline entity set
    pub fn new() -> std::result::Result<Self, ConfigurationError> {
        let registry = tweets::tweet_registry()?;
        let parsers = tweets::tweet_parsers(&registry)?;
        Self::with_parsers(registry, parsers)
    }

    /// Pipeline for a custom entity set
    pub fn with_parsers(
        registry: EntityRegistry,
        parsers: Vec<RecordParser>,
    ) -> std::result::Result<Self, ConfigurationError> {
        let parser = BatchParser::new(&registry, parsers)?;
        Ok(Self { registry, parser })
    }

    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    /// Run the full pipeline for one user
    ///
    /// Steps:
    /// 1. Fetch the latest posts
    /// 2. Store the raw document
    /// 3. Transform and load it
    pub async fn run<S>(
        &self,
        client: &TwitterClient,
        raw_store: &dyn RawStore,
        store: &mut S,
        handle: &str,
        count: u32,
    ) -> Result<PipelineResult>
    where
        S: EntityStore + ?Sized,
    {
        info!(handle, count, "Starting timeline ingestion");

        info!("Phase 1: Fetching timeline");
        let extraction = client
            .fetch(handle, count)
            .await
            .with_context(|| format!("Failed to fetch timeline of '{}'", handle))?;

        info!("Phase 2: Storing raw document");
        raw_store
            .write(&extraction.key, &extraction.document)
            .await
            .with_context(|| format!("Failed to store raw document '{}'", extraction.key))?;

        info!("Phase 3: Transforming and loading");
        self.process(extraction.key, extraction.document, store).await
    }

    /// Transform and load a previously stored raw document
    pub async fn rerun<S>(&self, raw_store: &dyn RawStore, store: &mut S, key: &str) -> Result<PipelineResult>
    where
        S: EntityStore + ?Sized,
    {
        info!(key, store = raw_store.name(), "Replaying raw document");

        let document = raw_store
            .read(key)
            .await
            .with_context(|| format!("Failed to read raw document '{}'", key))?;

        self.process(key.to_string(), document, store).await
    }

    /// List stored raw documents
    pub async fn list(&self, raw_store: &dyn RawStore, prefix: Option<&str>) -> Result<Listing> {
        raw_store
            .list(prefix)
            .await
            .context("Failed to list raw documents")
    }

    /// Transform `document` and load it into `store`
    pub async fn load_document<S>(&self, document: RawDocument, store: &mut S) -> std::result::Result<LoadStats, LoadError>
    where
        S: EntityStore + ?Sized,
    {
        let records = self.parser.process(document)?;
        Loader::new(&self.registry, store).load_all(records).await
    }

    async fn process<S>(&self, key: String, document: RawDocument, store: &mut S) -> Result<PipelineResult>
    where
        S: EntityStore + ?Sized,
    {
        let items = document.item_count(self.parser.items_key());
        let stats = self
            .load_document(document, store)
            .await
            .with_context(|| format!("Failed to load '{}' into {}", key, store.name()))?;

        info!(
            key = %key,
            items,
            loaded = stats.records_loaded,
            failed = stats.records_failed,
            skipped = stats.records_skipped,
            "Timeline ingestion completed"
        );

        Ok(PipelineResult { key, items, stats })
    }
}

/// Result of running the pipeline
#[derive(Debug, Clone)]
pub struct PipelineResult {
    /// Raw document key
    pub key: String,
    /// Items in the raw document
    pub items: usize,
    pub stats: LoadStats,
}

impl PipelineResult {
    /// Whether every item made it into the entity store
    pub fn is_complete(&self) -> bool {
        !self.stats.has_failures()
    }

    pub fn summary(&self) -> String {
        format!("Processed {} ({} items): {}", self.key, self.items, self.stats.summary())
    }
}
