use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::info;

use super::{reader, SnapshotError};
use crate::knowledge::{KnowledgeBaseSnapshot, SnapshotIndex};

#[derive(Debug, Clone)]
struct Published {
    snapshot: Arc<KnowledgeBaseSnapshot>,
    index: Arc<SnapshotIndex>,
}

impl Published {
    fn new(snapshot: KnowledgeBaseSnapshot) -> Self {
        let index = SnapshotIndex::build(&snapshot);
        Self {
            snapshot: Arc::new(snapshot),
            index: Arc::new(index),
        }
    }
}

/// The snapshot currently serving queries, with its query index.
///
/// Readers take a cheap `Arc` clone and keep using it for as long as they
/// like; `publish` swaps in a new snapshot without touching the old one.
#[derive(Debug)]
pub struct LiveSnapshot {
    current: RwLock<Published>,
}

impl LiveSnapshot {
    pub fn new(snapshot: KnowledgeBaseSnapshot) -> Self {
        Self {
            current: RwLock::new(Published::new(snapshot)),
        }
    }

    pub fn current(&self) -> Arc<KnowledgeBaseSnapshot> {
        Arc::clone(&self.current.read().snapshot)
    }

    /// The served snapshot together with the index built for it.
    pub fn current_indexed(&self) -> (Arc<KnowledgeBaseSnapshot>, Arc<SnapshotIndex>) {
        let published = self.current.read();
        (Arc::clone(&published.snapshot), Arc::clone(&published.index))
    }

    /// Replace the served snapshot, returning the previous one. The index is
    /// built before the swap, so readers never wait on it.
    pub fn publish(&self, snapshot: KnowledgeBaseSnapshot) -> Arc<KnowledgeBaseSnapshot> {
        let documents = snapshot.document_count();
        let published = Published::new(snapshot);
        let previous = std::mem::replace(&mut *self.current.write(), published);
        info!(documents, "snapshot published");
        previous.snapshot
    }

    /// Load a snapshot directory and publish it. On failure the served
    /// snapshot is left as it was.
    pub fn load_and_publish(
        &self,
        location: &Path,
    ) -> Result<Arc<KnowledgeBaseSnapshot>, SnapshotError> {
        let snapshot = reader::load(location)?;
        Ok(self.publish(snapshot))
    }
}
