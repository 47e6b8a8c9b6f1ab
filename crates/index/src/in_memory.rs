//! In-memory store — useful for testing and ephemeral sessions.

use async_trait::async_trait;
use kitsmith_core::IndexError;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::{IndexStore, LocationIndex};

/// Keeps the snapshot in process memory. Counts saves so tests can assert
/// whether a stage persisted.
pub struct InMemoryStore {
    snapshot: Arc<RwLock<LocationIndex>>,
    saves: Arc<RwLock<usize>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::with_index(LocationIndex::new())
    }

    /// Start from a pre-built index.
    pub fn with_index(index: LocationIndex) -> Self {
        Self {
            snapshot: Arc::new(RwLock::new(index)),
            saves: Arc::new(RwLock::new(0)),
        }
    }

    pub async fn save_count(&self) -> usize {
        *self.saves.read().await
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IndexStore for InMemoryStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn load(&self) -> Result<LocationIndex, IndexError> {
        Ok(self.snapshot.read().await.clone())
    }

    async fn save(&self, index: &LocationIndex) -> Result<(), IndexError> {
        *self.snapshot.write().await = index.clone();
        *self.saves.write().await += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kitsmith_core::{ItemId, Position};

    #[tokio::test]
    async fn save_then_load() {
        let store = InMemoryStore::new();
        assert!(store.load().await.unwrap().is_empty());

        let mut index = LocationIndex::new();
        index.insert(Position::new(1, 2, 3), ItemId(4));
        store.save(&index).await.unwrap();

        assert_eq!(store.load().await.unwrap(), index);
        assert_eq!(store.save_count().await, 1);
    }
}
