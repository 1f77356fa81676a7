use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use serde::de::DeserializeOwned;
use tracing::info;

use super::manifest::{self, SnapshotManifest, MANIFEST_FILE, TABLES};
use super::SnapshotError;
use crate::compress::CompressedTables;
use crate::knowledge::{KnowledgeBaseSnapshot, SNAPSHOT_FORMAT_VERSION};
use crate::types::identifiers::Fingerprint;

fn corrupt(table: &str, reason: impl Into<String>) -> SnapshotError {
    SnapshotError::CorruptSnapshot {
        table: table.to_string(),
        reason: reason.into(),
    }
}

fn read_file(path: &Path, table: &str) -> Result<Vec<u8>, SnapshotError> {
    match fs::read(path) {
        Ok(bytes) => Ok(bytes),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            Err(corrupt(table, format!("missing file {}", path.display())))
        }
        Err(e) => Err(SnapshotError::Io(e)),
    }
}

fn read_manifest(root: &Path) -> Result<SnapshotManifest, SnapshotError> {
    let bytes = read_file(&root.join(MANIFEST_FILE), "manifest")?;
    let manifest: SnapshotManifest =
        serde_json::from_slice(&bytes).map_err(|e| corrupt("manifest", e.to_string()))?;

    if manifest.format_version != SNAPSHOT_FORMAT_VERSION {
        return Err(SnapshotError::UnsupportedFormat {
            found: manifest.format_version,
            expected: SNAPSHOT_FORMAT_VERSION,
        });
    }

    for name in TABLES {
        if manifest.table(name).is_none() {
            return Err(corrupt(name, "not listed in manifest"));
        }
    }

    let expected = SnapshotManifest::compute_version(
        &manifest.config_fingerprint,
        &manifest.build_config,
        &manifest.tables,
    )
    .map_err(|e| corrupt("manifest", e.to_string()))?;
    if expected != manifest.snapshot_version {
        return Err(corrupt(
            "manifest",
            format!(
                "snapshot version mismatch: manifest says {}, contents hash to {}",
                manifest.snapshot_version, expected
            ),
        ));
    }

    Ok(manifest)
}

fn read_table<T: DeserializeOwned>(
    root: &Path,
    manifest: &SnapshotManifest,
    name: &str,
) -> Result<T, SnapshotError> {
    let entry = manifest
        .table(name)
        .ok_or_else(|| corrupt(name, "not listed in manifest"))?;

    let bytes = read_file(&root.join(&entry.file), name)?;

    let checksum = Fingerprint::from_content(&bytes);
    if checksum != entry.checksum {
        return Err(corrupt(
            name,
            format!(
                "checksum mismatch: manifest says {}, content hashes to {}",
                entry.checksum, checksum
            ),
        ));
    }

    serde_json::from_slice(&bytes).map_err(|e| corrupt(name, e.to_string()))
}

/// Load and verify the snapshot directory at `location`.
///
/// Nothing partial is ever returned: a missing or inconsistent table fails
/// the whole load.
pub fn load(location: &Path) -> Result<KnowledgeBaseSnapshot, SnapshotError> {
    load_with_manifest(location).map(|(snapshot, _)| snapshot)
}

pub fn load_with_manifest(
    location: &Path,
) -> Result<(KnowledgeBaseSnapshot, SnapshotManifest), SnapshotError> {
    let manifest = read_manifest(location)?;

    let snapshot = KnowledgeBaseSnapshot {
        format_version: manifest.format_version,
        config: manifest.build_config.clone(),
        config_fingerprint: manifest.config_fingerprint.clone(),
        dictionary: read_table(location, &manifest, manifest::DICTIONARY)?,
        embeddings: read_table(location, &manifest, manifest::EMBEDDINGS)?,
        word_hash: read_table(location, &manifest, manifest::WORD_HASH)?,
        hash_see: read_table(location, &manifest, manifest::HASH_SEE)?,
        hash_related: read_table(location, &manifest, manifest::HASH_RELATED)?,
        hash_category: read_table(location, &manifest, manifest::HASH_CATEGORY)?,
        ngrams: read_table(location, &manifest, manifest::NGRAMS)?,
        compressed: CompressedTables {
            ngrams: read_table(location, &manifest, manifest::COMPRESSED_NGRAMS)?,
            word_pairs: read_table(location, &manifest, manifest::COMPRESSED_WORD_PAIRS)?,
        },
        url_map: read_table(location, &manifest, manifest::URL_MAP)?,
    };

    snapshot.validate()?;

    if snapshot.document_count() != manifest.document_count
        || snapshot.dictionary.len() != manifest.dictionary_size
    {
        return Err(corrupt("manifest", "counts do not match the tables"));
    }

    info!(
        location = %location.display(),
        version = %manifest.snapshot_version,
        documents = manifest.document_count,
        "snapshot loaded"
    );

    Ok((snapshot, manifest))
}
