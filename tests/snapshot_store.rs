use std::fs;
use std::path::Path;

use tempfile::tempdir;
use xllm_core::config::BuildConfig;
use xllm_core::document::DocumentRecord;
use xllm_core::knowledge::{KnowledgeBaseSnapshot, TableBuilder, SNAPSHOT_FORMAT_VERSION};
use xllm_core::store::{self, SnapshotError, SnapshotManifest, MANIFEST_FILE, TABLES};
use xllm_core::types::Fingerprint;

fn make_record(source_id: &str, category: &str, text: &str) -> DocumentRecord {
    DocumentRecord::new(source_id, category, text)
}

fn build() -> KnowledgeBaseSnapshot {
    TableBuilder::new(BuildConfig::v0())
        .build(vec![
            make_record("a", "ai", "neural networks learn representations")
                .with_title("Neural Networks")
                .with_see_also("gradient descent"),
            make_record("b", "ai", "gradient descent trains neural networks"),
            make_record("c", "math", "gradient descent minimizes loss functions"),
        ])
        .unwrap()
}

fn read_manifest(root: &Path) -> SnapshotManifest {
    let bytes = fs::read(root.join(MANIFEST_FILE)).unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Replace a table file and patch the manifest so checksums stay consistent.
fn rewrite_table(root: &Path, name: &str, content: &[u8]) {
    let mut manifest = read_manifest(root);
    let entry = manifest.tables.iter_mut().find(|t| t.name == name).unwrap();
    fs::write(root.join(&entry.file), content).unwrap();
    entry.checksum = Fingerprint::from_content(content);
    manifest.snapshot_version = SnapshotManifest::compute_version(
        &manifest.config_fingerprint,
        &manifest.build_config,
        &manifest.tables,
    )
    .unwrap();
    fs::write(
        root.join(MANIFEST_FILE),
        serde_json::to_vec_pretty(&manifest).unwrap(),
    )
    .unwrap();
}

fn expect_corrupt(result: Result<KnowledgeBaseSnapshot, SnapshotError>, table: &str) {
    match result {
        Err(SnapshotError::CorruptSnapshot { table: t, .. }) => assert_eq!(t, table),
        other => panic!("expected corrupt {table}, got {other:?}"),
    }
}

#[test]
fn round_trip_preserves_snapshot() {
    let dir = tempdir().unwrap();
    let kb = dir.path().join("kb");
    let snapshot = build();

    let manifest = store::save(&snapshot, &kb).unwrap();
    let loaded = store::load(&kb).unwrap();

    assert_eq!(loaded, snapshot);
    assert_eq!(manifest.format_version, SNAPSHOT_FORMAT_VERSION);
    assert_eq!(manifest.document_count, 3);
    assert_eq!(manifest.dictionary_size, snapshot.dictionary.len());
    assert_eq!(manifest.config_fingerprint, snapshot.config_fingerprint);
}

#[test]
fn snapshot_directory_has_one_file_per_table() {
    let dir = tempdir().unwrap();
    let kb = dir.path().join("kb_layout");
    let manifest = store::save(&build(), &kb).unwrap();

    assert!(kb.join(MANIFEST_FILE).exists());
    for name in TABLES {
        assert!(kb.join(format!("{name}.json")).exists(), "missing {name}");
        assert!(manifest.table(name).is_some());
    }

    let leftovers: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
    assert_eq!(leftovers.len(), 1, "temp directory must be renamed away");
}

#[test]
fn invariant_save_refuses_existing_location() {
    let dir = tempdir().unwrap();
    let kb = dir.path().join("kb_exists");
    fs::create_dir(&kb).unwrap();

    match store::save(&build(), &kb) {
        Err(SnapshotError::OutputExists(path)) => assert_eq!(path, kb),
        other => panic!("expected OutputExists, got {other:?}"),
    }
}

#[test]
fn missing_manifest_is_corrupt() {
    let dir = tempdir().unwrap();
    let kb = dir.path().join("kb_no_manifest");
    store::save(&build(), &kb).unwrap();
    fs::remove_file(kb.join(MANIFEST_FILE)).unwrap();

    expect_corrupt(store::load(&kb), "manifest");
}

#[test]
fn missing_table_is_corrupt() {
    let dir = tempdir().unwrap();
    let kb = dir.path().join("kb_missing");
    store::save(&build(), &kb).unwrap();
    fs::remove_file(kb.join("ngrams.json")).unwrap();

    expect_corrupt(store::load(&kb), "ngrams");
}

#[test]
fn tampered_table_fails_checksum() {
    let dir = tempdir().unwrap();
    let kb = dir.path().join("kb_tampered");
    store::save(&build(), &kb).unwrap();

    let path = kb.join("url_map.json");
    let mut bytes = fs::read(&path).unwrap();
    bytes.push(b' ');
    fs::write(&path, bytes).unwrap();

    match store::load(&kb) {
        Err(SnapshotError::CorruptSnapshot { table, reason }) => {
            assert_eq!(table, "url_map");
            assert!(reason.contains("checksum"), "unexpected reason: {reason}");
        }
        other => panic!("expected checksum failure, got {other:?}"),
    }
}

#[test]
fn dangling_token_id_is_corrupt() {
    let dir = tempdir().unwrap();
    let kb = dir.path().join("kb_dangling");
    let snapshot = build();
    store::save(&snapshot, &kb).unwrap();

    let mut hash_category = snapshot.hash_category.clone();
    let dangling = xllm_core::types::TokenId::new(snapshot.dictionary.len() as u32 + 10);
    hash_category.entry(dangling).or_default().insert("ai".to_string(), 1);
    rewrite_table(&kb, "hash_category", &serde_json::to_vec(&hash_category).unwrap());

    expect_corrupt(store::load(&kb), "hash_category");
}

#[test]
fn inconsistent_compressed_table_is_corrupt() {
    let dir = tempdir().unwrap();
    let kb = dir.path().join("kb_compressed");
    let snapshot = build();
    store::save(&snapshot, &kb).unwrap();

    let mut pairs = snapshot.compressed.word_pairs.clone();
    assert!(!pairs.symmetric.is_empty());
    pairs.symmetric[0].2 += 1;
    rewrite_table(&kb, "compressed_word_pairs", &serde_json::to_vec(&pairs).unwrap());

    expect_corrupt(store::load(&kb), "compressed_word_pairs");
}

#[test]
fn unsupported_format_is_rejected() {
    let dir = tempdir().unwrap();
    let kb = dir.path().join("kb_format");
    store::save(&build(), &kb).unwrap();

    let mut manifest = read_manifest(&kb);
    manifest.format_version = SNAPSHOT_FORMAT_VERSION + 1;
    fs::write(kb.join(MANIFEST_FILE), serde_json::to_vec(&manifest).unwrap()).unwrap();

    match store::load(&kb) {
        Err(SnapshotError::UnsupportedFormat { found, expected }) => {
            assert_eq!(found, SNAPSHOT_FORMAT_VERSION + 1);
            assert_eq!(expected, SNAPSHOT_FORMAT_VERSION);
        }
        other => panic!("expected UnsupportedFormat, got {other:?}"),
    }
}

#[test]
fn invariant_edited_build_config_is_corrupt() {
    let dir = tempdir().unwrap();
    let kb = dir.path().join("kb_config");
    store::save(&build(), &kb).unwrap();

    // Tables and checksums untouched; only the recorded config changes.
    let mut manifest = read_manifest(&kb);
    manifest
        .build_config
        .tokenizer
        .normalizer
        .stop_words
        .insert("deep".to_string());
    fs::write(kb.join(MANIFEST_FILE), serde_json::to_vec(&manifest).unwrap()).unwrap();

    expect_corrupt(store::load(&kb), "manifest");
}

#[test]
fn load_with_manifest_returns_saved_manifest() {
    let dir = tempdir().unwrap();
    let kb = dir.path().join("kb_manifest");
    let saved = store::save(&build(), &kb).unwrap();

    let (_, loaded) = store::load_with_manifest(&kb).unwrap();
    assert_eq!(loaded, saved);
}
