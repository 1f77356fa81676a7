pub mod live;
pub mod manifest;
pub mod reader;
pub mod writer;

use std::path::PathBuf;

use thiserror::Error;

use crate::knowledge::IntegrityError;

pub use live::LiveSnapshot;
pub use manifest::{ManifestTableEntry, SnapshotManifest, MANIFEST_FILE, TABLES};
pub use reader::{load, load_with_manifest};
pub use writer::save;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Output directory already exists: {0}")]
    OutputExists(PathBuf),
    #[error("Corrupt snapshot table {table}: {reason}")]
    CorruptSnapshot { table: String, reason: String },
    #[error("Unsupported snapshot format version {found} (expected {expected})")]
    UnsupportedFormat { found: u32, expected: u32 },
}

impl From<IntegrityError> for SnapshotError {
    fn from(e: IntegrityError) -> Self {
        SnapshotError::CorruptSnapshot {
            table: e.table.to_string(),
            reason: e.reason,
        }
    }
}
