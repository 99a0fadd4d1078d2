//! Dotted field-path selection over nested documents
//!
//! A path such as `user.screen_name` descends through nested mappings and
//! copies the final value under its own name (`screen_name`). A path whose
//! final segment is `*` or empty (`user.*`, `user.`, `*`) copies every entry
//! of the mapping it reaches, one level deep. Paths are applied in order and
//! later paths win on key collisions.
//!
//! ```
//! use serde_json::json;
//! use tweetpipe_core::field_path::resolve;
//!
//! let doc = json!({"id": 1, "user": {"id": 9, "name": "Alice"}});
//! let flat = resolve(doc.as_object().unwrap(), &["id", "user.*"]).unwrap();
//! assert_eq!(flat["id"], 9);
//! assert_eq!(flat["name"], "Alice");
//! ```

use serde_json::Value;

use crate::document::FieldSet;
use crate::error::TransformError;

/// Segment separator
pub const SEPARATOR: char = '.';

/// Final segment that flattens the mapping it reaches
pub const WILDCARD: &str = "*";

/// Resolves `paths` against `document` into one flat mapping
///
/// An empty path list returns a copy of the document unchanged. The source
/// document is never mutated.
pub fn resolve<S: AsRef<str>>(document: &FieldSet, paths: &[S]) -> Result<FieldSet, TransformError> {
    if paths.is_empty() {
        return Ok(document.clone());
    }

    let mut result = FieldSet::new();
    for path in paths {
        resolve_into(document, path.as_ref(), &mut result)?;
    }
    Ok(result)
}

/// Resolves a single path, merging its output into `out`
pub fn resolve_into(document: &FieldSet, path: &str, out: &mut FieldSet) -> Result<(), TransformError> {
    let segments: Vec<&str> = path.split(SEPARATOR).collect();
    let Some((last, parents)) = segments.split_last() else {
        return Ok(());
    };

    let flatten = last.is_empty() || *last == WILDCARD;

    let mut current = document;
    for (position, segment) in parents.iter().enumerate() {
        current = match current.get(*segment) {
            Some(Value::Object(nested)) => nested,
            Some(_) if flatten && position + 1 == parents.len() => {
                return Err(TransformError::NotAMapping {
                    path: path.to_string(),
                })
            }
            _ => {
                return Err(TransformError::PathNotFound {
                    path: path.to_string(),
                    segment: (*segment).to_string(),
                })
            }
        };
    }

    if flatten {
        for (key, value) in current {
            out.insert(key.clone(), value.clone());
        }
        return Ok(());
    }

    match current.get(*last) {
        Some(value) => {
            out.insert((*last).to_string(), value.clone());
            Ok(())
        }
        None => Err(TransformError::PathNotFound {
            path: path.to_string(),
            segment: (*last).to_string(),
        }),
    }
}

/// Resolves a path to a single nested value without copying
pub fn lookup<'a>(document: &'a FieldSet, path: &str) -> Option<&'a Value> {
    let mut segments = path.split(SEPARATOR);
    let first = segments.next()?;
    let mut current = document.get(first)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}
