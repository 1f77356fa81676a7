use std::fs;
use std::io::Write;
use std::path::Path;

use chrono::Utc;
use tracing::{debug, info};

use super::manifest::{self, ManifestTableEntry, SnapshotManifest, MANIFEST_FILE};
use super::SnapshotError;
use crate::knowledge::KnowledgeBaseSnapshot;
use crate::types::identifiers::Fingerprint;

/// Serialized tables in manifest order.
fn encode_tables(
    snapshot: &KnowledgeBaseSnapshot,
) -> Result<Vec<(&'static str, Vec<u8>)>, SnapshotError> {
    Ok(vec![
        (manifest::DICTIONARY, serde_json::to_vec(&snapshot.dictionary)?),
        (manifest::EMBEDDINGS, serde_json::to_vec(&snapshot.embeddings)?),
        (manifest::WORD_HASH, serde_json::to_vec(&snapshot.word_hash)?),
        (manifest::HASH_SEE, serde_json::to_vec(&snapshot.hash_see)?),
        (manifest::HASH_RELATED, serde_json::to_vec(&snapshot.hash_related)?),
        (manifest::HASH_CATEGORY, serde_json::to_vec(&snapshot.hash_category)?),
        (manifest::NGRAMS, serde_json::to_vec(&snapshot.ngrams)?),
        (manifest::COMPRESSED_NGRAMS, serde_json::to_vec(&snapshot.compressed.ngrams)?),
        (
            manifest::COMPRESSED_WORD_PAIRS,
            serde_json::to_vec(&snapshot.compressed.word_pairs)?,
        ),
        (manifest::URL_MAP, serde_json::to_vec(&snapshot.url_map)?),
    ])
}

/// Write `snapshot` as a new snapshot directory at `location`.
///
/// Tables go to a sibling temp directory first, which is renamed into
/// place once everything is synced. An existing `location` is refused.
pub fn save(
    snapshot: &KnowledgeBaseSnapshot,
    location: &Path,
) -> Result<SnapshotManifest, SnapshotError> {
    if location.exists() {
        return Err(SnapshotError::OutputExists(location.to_path_buf()));
    }

    snapshot.validate()?;

    let encoded = encode_tables(snapshot)?;
    let tables: Vec<ManifestTableEntry> = encoded
        .iter()
        .map(|(name, bytes)| ManifestTableEntry {
            name: name.to_string(),
            file: manifest::table_file(name),
            checksum: Fingerprint::from_content(bytes),
        })
        .collect();

    let snapshot_version =
        SnapshotManifest::compute_version(&snapshot.config_fingerprint, &snapshot.config, &tables)?;

    // Note: created_at is strictly informational
    let manifest = SnapshotManifest {
        format_version: snapshot.format_version,
        snapshot_version: snapshot_version.clone(),
        config_fingerprint: snapshot.config_fingerprint.clone(),
        build_config: snapshot.config.clone(),
        created_at: Utc::now(),
        document_count: snapshot.document_count(),
        dictionary_size: snapshot.dictionary.len(),
        tables,
    };

    // Unique per snapshot version, so concurrent saves of different
    // snapshots next to each other never share a temp dir.
    let temp_suffix = format!("tmp.{}", &snapshot_version.digest()[..12]);
    let temp_dir = location.with_extension(temp_suffix);

    // Stale leftovers of a crashed save of this same version.
    if temp_dir.exists() {
        fs::remove_dir_all(&temp_dir)?;
    }
    fs::create_dir_all(&temp_dir)?;

    for ((_, bytes), entry) in encoded.iter().zip(&manifest.tables) {
        let mut f = fs::File::create(temp_dir.join(&entry.file))?;
        f.write_all(bytes)?;
        f.sync_all()?;
        debug!(table = %entry.name, bytes = bytes.len(), "table written");
    }

    let manifest_file = fs::File::create(temp_dir.join(MANIFEST_FILE))?;
    serde_json::to_writer_pretty(&manifest_file, &manifest)?;
    manifest_file.sync_all()?;

    fs::rename(&temp_dir, location)?;

    info!(
        location = %location.display(),
        version = %manifest.snapshot_version,
        documents = manifest.document_count,
        "snapshot saved"
    );

    Ok(manifest)
}
