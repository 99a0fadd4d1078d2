//! TweetPipe Core
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Extract-transform-load engine for user timelines.
//!
//! # Architecture
//!
//! - **extract**: fetches the latest posts of a user and wraps them with fetch
//!   metadata into a [`RawDocument`]
//! - **raw_store**: persists raw documents (local filesystem or S3) so a run
//!   can be replayed later
//! - **transform**: declarative field extraction. A [`RecordParser`] turns a
//!   nested item into one flat field set for one entity; the [`BatchParser`]
//!   fans every item out to all registered parsers
//! - **load**: the [`Loader`] walks the entity load order, wires foreign keys
//!   from already materialized instances and upserts by natural key
//! - **pipeline**: glues the stages together
//!
//! # Example
//!
//! ```no_run
//! use tweetpipe_core::{load::MemoryEntityStore, RawDocument, TweetPipeline};
//!
//! # async fn example(document: RawDocument) -> anyhow::Result<()> {
//! let pipeline = TweetPipeline::new()?;
//! let mut store = MemoryEntityStore::new();
//! let stats = pipeline.load_document(document, &mut store).await?;
//! println!("{}", stats.summary());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod document;
pub mod error;
pub mod extract;
pub mod field_path;
pub mod load;
pub mod pipeline;
pub mod raw_store;
pub mod schema;
pub mod transform;

// Re-export commonly used types
pub use config::Config;
pub use document::{EntityData, FieldSet, MultiEntityRecord, ParsedRecord, RawDocument};
pub use error::{ConfigurationError, ItemError, TransformError, ValueError};
pub use load::{EntityStore, LoadError, LoadStats, Loader};
pub use pipeline::{PipelineResult, TweetPipeline};
pub use schema::{EntityRegistry, EntitySchema, ForeignKey};
pub use transform::{BatchParser, RecordParser};
