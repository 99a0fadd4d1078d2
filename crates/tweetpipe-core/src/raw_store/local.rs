//! Raw store on the local filesystem

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info, instrument};
use walkdir::WalkDir;

use super::{validate_key, Listing, RawStore, RawStoreError};
use crate::document::RawDocument;

/// Stores every raw document as a JSON file below `root`
#[derive(Debug, Clone)]
pub struct LocalRawStore {
    root: PathBuf,
}

impl LocalRawStore {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path(&self, key: &str) -> Result<PathBuf, RawStoreError> {
        validate_key(key)?;
        Ok(key.split('/').fold(self.root.clone(), |path, segment| path.join(segment)))
    }
}

/// Keys of every `.json` file below `root`, with `/` separators
///
/// Symlinked directories are followed. A missing root is an empty store; any
/// other traversal failure is an error.
fn scan(root: &Path) -> Result<Vec<String>, walkdir::Error> {
    if !root.is_dir() {
        return Ok(Vec::new());
    }

    let mut keys = Vec::new();
    for entry in WalkDir::new(root).follow_links(true) {
        let entry = entry?;
        if !entry.file_type().is_file() || entry.path().extension().is_none_or(|ext| ext != "json") {
            continue;
        }

        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        let segments: Option<Vec<&str>> = relative.components().map(|c| c.as_os_str().to_str()).collect();
        if let Some(segments) = segments {
            keys.push(segments.join("/"));
        }
    }
    Ok(keys)
}

#[async_trait]
impl RawStore for LocalRawStore {
    fn name(&self) -> &str {
        "local"
    }

    #[instrument(skip(self, document))]
    async fn write(&self, key: &str, document: &RawDocument) -> Result<(), RawStoreError> {
        let path = self.path(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let data = serde_json::to_vec_pretty(document)?;
        let size = data.len();
        tokio::fs::write(&path, data).await?;

        info!(key, size, path = %path.display(), "Wrote raw document");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn read(&self, key: &str) -> Result<RawDocument, RawStoreError> {
        let path = self.path(key)?;
        let data = match tokio::fs::read(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(RawStoreError::NotFound(key.to_string()))
            }
            Err(e) => return Err(e.into()),
        };

        debug!(key, size = data.len(), "Read raw document");
        Ok(serde_json::from_slice(&data)?)
    }

    async fn list(&self, prefix: Option<&str>) -> Result<Listing, RawStoreError> {
        let root = self.root.clone();
        let keys = tokio::task::spawn_blocking(move || scan(&root))
            .await
            .map_err(|e| RawStoreError::Io(std::io::Error::other(e)))?
            .map_err(|e| RawStoreError::Io(e.into()))?;

        let keys = keys
            .into_iter()
            .filter(|key| prefix.is_none_or(|prefix| key.starts_with(prefix)))
            .collect();

        let listing = Listing::new(prefix, keys);
        debug!(prefix = %listing.prefix, count = listing.count, "Listed raw documents");
        Ok(listing)
    }
}
