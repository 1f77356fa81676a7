use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::BuildConfig;
use crate::types::identifiers::Fingerprint;

pub const MANIFEST_FILE: &str = "manifest.json";

pub const DICTIONARY: &str = "dictionary";
pub const EMBEDDINGS: &str = "embeddings";
pub const WORD_HASH: &str = "word_hash";
pub const HASH_SEE: &str = "hash_see";
pub const HASH_RELATED: &str = "hash_related";
pub const HASH_CATEGORY: &str = "hash_category";
pub const NGRAMS: &str = "ngrams";
pub const COMPRESSED_NGRAMS: &str = "compressed_ngrams";
pub const COMPRESSED_WORD_PAIRS: &str = "compressed_word_pairs";
pub const URL_MAP: &str = "url_map";

/// Every table a snapshot directory must contain, in manifest order.
pub const TABLES: [&str; 10] = [
    DICTIONARY,
    EMBEDDINGS,
    WORD_HASH,
    HASH_SEE,
    HASH_RELATED,
    HASH_CATEGORY,
    NGRAMS,
    COMPRESSED_NGRAMS,
    COMPRESSED_WORD_PAIRS,
    URL_MAP,
];

pub fn table_file(name: &str) -> String {
    format!("{name}.json")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestTableEntry {
    pub name: String,
    pub file: String,
    /// Hash of the file's exact bytes.
    pub checksum: Fingerprint,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotManifest {
    pub format_version: u32,
    /// Hash over the tokenizer fingerprint, the build config and every
    /// table checksum.
    pub snapshot_version: Fingerprint,
    pub config_fingerprint: Fingerprint,
    pub build_config: BuildConfig,
    pub created_at: DateTime<Utc>, // informational only
    pub document_count: usize,
    pub dictionary_size: usize,
    pub tables: Vec<ManifestTableEntry>,
}

impl SnapshotManifest {
    pub fn table(&self, name: &str) -> Option<&ManifestTableEntry> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Derive the snapshot version from its parts; `created_at` is not one.
    /// The build config is hashed in its JSON form, whose field order is fixed.
    pub fn compute_version(
        config_fingerprint: &Fingerprint,
        build_config: &BuildConfig,
        tables: &[ManifestTableEntry],
    ) -> Result<Fingerprint, serde_json::Error> {
        let config = serde_json::to_vec(build_config)?;
        let parts = [
            ("fingerprint", config_fingerprint.as_str().as_bytes()),
            ("build_config", config.as_slice()),
        ];
        let tables = tables
            .iter()
            .map(|t| (t.name.as_str(), t.checksum.as_str().as_bytes()));
        Ok(Fingerprint::from_parts(parts.into_iter().chain(tables)))
    }
}
