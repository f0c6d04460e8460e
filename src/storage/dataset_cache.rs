use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::info;

use crate::storage::object_store::PartitionedDataset;
use crate::Result;

/// Process-wide handle to the most recently opened dataset, keyed by its root.
///
/// Replacing the handle is not atomic with respect to readers: a lookup racing
/// a path change may finish on the previous `Arc`. Dataset contents for a
/// given root never change, so either handle gives the same answer.
#[derive(Debug, Default)]
pub struct DatasetCache {
    slot: RwLock<Option<Arc<PartitionedDataset>>>,
}

impl DatasetCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached dataset for `root`, opening it if nothing is cached
    /// yet or the cached dataset belongs to another root.
    pub fn get_or_open(&self, root: &Path) -> Result<Arc<PartitionedDataset>> {
        if let Some(dataset) = self.cached_for(root) {
            return Ok(dataset);
        }

        let dataset = Arc::new(PartitionedDataset::open(root)?);
        *self.slot.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(&dataset));
        info!(
            root = %root.display(),
            fragments = dataset.fragments().len(),
            "dataset handle initialized"
        );
        Ok(dataset)
    }

    fn cached_for(&self, root: &Path) -> Option<Arc<PartitionedDataset>> {
        let slot = self.slot.read().unwrap_or_else(PoisonError::into_inner);
        slot.as_ref().filter(|d| d.root() == root).cloned()
    }

    /// Root of the cached dataset, if any.
    pub fn cached_root(&self) -> Option<PathBuf> {
        let slot = self.slot.read().unwrap_or_else(PoisonError::into_inner);
        slot.as_ref().map(|d| d.root().to_path_buf())
    }
}
