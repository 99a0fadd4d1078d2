//! Transform stage
//!
//! - [`record`]: single-entity parser with its builder and transform types
//! - [`common`]: metadata selector and timestamp transform shared by all
//!   tweet parsers
//! - [`tweets`]: the timeline entity set and its parsers
//! - [`batch`]: runs every parser over every item of a raw document

pub mod batch;
pub mod common;
pub mod record;
pub mod tweets;

pub use batch::{BatchParser, ParsedItems};
pub use common::with_common_transforms;
pub use record::{Cardinality, FieldTransform, RecordParser, RecordParserBuilder, RecordTransform, TransformSpec};
