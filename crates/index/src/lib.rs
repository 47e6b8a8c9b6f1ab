//! Location Index for kitsmith.
//!
//! Maps storage-container positions to the item ids packaged inside them.
//! Built by the scanner, consulted by acquisition, and persisted between
//! sessions through an [`IndexStore`] backend.

pub mod file_backend;
pub mod in_memory;
pub mod location;
pub mod selector;

pub use file_backend::FileStore;
pub use in_memory::InMemoryStore;
pub use location::LocationIndex;
pub use selector::{FirstMatch, Nearest, SourceSelector, selector_by_name};

use async_trait::async_trait;
use kitsmith_core::IndexError;

/// Persistence backend for the Location Index.
///
/// Snapshots are rewritten wholesale; there is no incremental update.
#[async_trait]
pub trait IndexStore: Send + Sync {
    /// Human-readable backend name.
    fn name(&self) -> &str;

    /// Load the latest snapshot. A missing snapshot is an empty index.
    async fn load(&self) -> Result<LocationIndex, IndexError>;

    /// Replace the stored snapshot.
    async fn save(&self, index: &LocationIndex) -> Result<(), IndexError>;
}
