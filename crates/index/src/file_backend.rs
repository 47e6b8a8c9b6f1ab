//! File-based index store: a single pretty-printed JSON snapshot.
//!
//! The snapshot is a JSON object mapping `"x,y,z"` keys to arrays of numeric
//! item ids, e.g. `{"10,64,10": [812]}`. It is human-inspectable and is
//! rewritten wholesale on every save.
//!
//! Default location: `~/.kitsmith/itemDictionary.json`

use async_trait::async_trait;
use kitsmith_core::{IndexError, ItemId, Position};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::{IndexStore, LocationIndex};

/// A JSON-file-backed Location Index store.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Default path: `~/.kitsmith/itemDictionary.json`
    pub fn default_path() -> PathBuf {
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(".kitsmith").join("itemDictionary.json")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parse a snapshot, skipping entries whose key or ids are malformed.
    fn parse(content: &str) -> Result<LocationIndex, IndexError> {
        let raw: BTreeMap<String, serde_json::Value> = serde_json::from_str(content)
            .map_err(|e| IndexError::Corrupt(format!("Snapshot is not a JSON object: {e}")))?;

        let mut index = LocationIndex::new();
        for (key, value) in raw {
            let position = match key.parse::<Position>() {
                Ok(p) => p,
                Err(e) => {
                    warn!(key = %key, error = %e, "Skipping corrupted index entry");
                    continue;
                }
            };
            match serde_json::from_value::<Vec<ItemId>>(value) {
                Ok(ids) => index.record(position, ids),
                Err(e) => warn!(position = %position, error = %e, "Skipping corrupted index entry"),
            }
        }
        Ok(index)
    }
}

#[async_trait]
impl IndexStore for FileStore {
    fn name(&self) -> &str {
        "file"
    }

    async fn load(&self) -> Result<LocationIndex, IndexError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            // No snapshot yet, start empty
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(LocationIndex::new()),
            Err(e) => {
                return Err(IndexError::Storage(format!(
                    "Failed to read index file {}: {e}",
                    self.path.display()
                )));
            }
        };

        if content.trim().is_empty() {
            return Ok(LocationIndex::new());
        }

        let index = Self::parse(&content)?;
        debug!(path = %self.path.display(), entries = index.len(), "Location index loaded");
        Ok(index)
    }

    async fn save(&self, index: &LocationIndex) -> Result<(), IndexError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                IndexError::Storage(format!("Failed to create index directory: {e}"))
            })?;
        }

        let content = serde_json::to_string_pretty(index)
            .map_err(|e| IndexError::Storage(format!("Failed to serialize index: {e}")))?;

        // Write beside the snapshot, then swap it in
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, content)
            .map_err(|e| IndexError::Storage(format!("Failed to write index file: {e}")))?;
        std::fs::rename(&tmp, &self.path)
            .map_err(|e| IndexError::Storage(format!("Failed to replace index file: {e}")))?;

        debug!(path = %self.path.display(), entries = index.len(), "Location index saved");
        Ok(())
    }
}
