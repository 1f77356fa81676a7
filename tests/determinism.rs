use std::fs;

use tempfile::tempdir;
use xllm_core::config::BuildConfig;
use xllm_core::document::DocumentRecord;
use xllm_core::knowledge::{KnowledgeBaseSnapshot, TableBuilder};
use xllm_core::store::{self, TABLES};

fn make_record(source_id: &str, category: &str, text: &str) -> DocumentRecord {
    DocumentRecord::new(source_id, category, text)
}

fn corpus() -> Vec<DocumentRecord> {
    vec![
        make_record(
            "https://example.com/ml",
            "ai",
            "Machine learning models learn patterns. Machine learning needs data.",
        )
        .with_title("Machine Learning"),
        make_record(
            "https://example.com/gpu",
            "hardware",
            "GPU clusters train machine learning models faster than CPU clusters.",
        )
        .with_see_also("machine learning"),
        make_record(
            "https://example.com/finance",
            "finance",
            "Revenue growth of GPU vendors follows data center demand and revenue growth.",
        ),
    ]
}

fn build() -> KnowledgeBaseSnapshot {
    TableBuilder::new(BuildConfig::v0()).build(corpus()).unwrap()
}

#[test]
fn invariant_build_is_idempotent() {
    let first = build();
    let second = build();

    assert_eq!(first, second);

    let ids_first: Vec<_> = first.dictionary.iter().map(|e| (e.id, e.surface.clone())).collect();
    let ids_second: Vec<_> = second.dictionary.iter().map(|e| (e.id, e.surface.clone())).collect();
    assert_eq!(ids_first, ids_second);
}

#[test]
fn invariant_saved_tables_are_byte_identical() {
    let dir = tempdir().unwrap();
    let a = dir.path().join("kb_a");
    let b = dir.path().join("kb_b");

    let manifest_a = store::save(&build(), &a).unwrap();
    let manifest_b = store::save(&build(), &b).unwrap();

    assert_eq!(manifest_a.snapshot_version, manifest_b.snapshot_version);
    assert_eq!(manifest_a.tables, manifest_b.tables);

    for name in TABLES {
        let file = format!("{name}.json");
        let bytes_a = fs::read(a.join(&file)).unwrap();
        let bytes_b = fs::read(b.join(&file)).unwrap();
        assert_eq!(bytes_a, bytes_b, "table {name} differs between builds");
    }
}

#[test]
fn invariant_ids_follow_first_occurrence() {
    let snapshot = build();

    let first_single = snapshot.dictionary.get(xllm_core::types::TokenId::new(0)).unwrap();
    assert_eq!(first_single.surface, "machine");

    // Multitokens are appended after every single token.
    let first_multi = snapshot
        .dictionary
        .iter()
        .position(|e| e.is_multitoken())
        .unwrap();
    assert!(snapshot.dictionary.iter().skip(first_multi).all(|e| e.is_multitoken()));
}

#[test]
fn invariant_record_order_changes_ids_not_content() {
    let forward = build();

    let mut records = corpus();
    records.reverse();
    let reversed = TableBuilder::new(BuildConfig::v0()).build(records).unwrap();

    assert_ne!(
        forward.dictionary.get(xllm_core::types::TokenId::new(0)).map(|e| e.surface.clone()),
        reversed.dictionary.get(xllm_core::types::TokenId::new(0)).map(|e| e.surface.clone()),
    );
    assert_eq!(forward.document_count(), reversed.document_count());
}

#[test]
fn invariant_persisted_maps_are_sorted() {
    let dir = tempdir().unwrap();
    let kb = dir.path().join("kb_sorted");
    store::save(&build(), &kb).unwrap();

    let word_hash = fs::read_to_string(kb.join("word_hash.json")).unwrap();
    let data_pos = word_hash.find("\"data\":{").expect("missing data key");
    let machine_pos = word_hash.find("\"machine\":{").expect("missing machine key");
    assert!(data_pos < machine_pos, "word-hash keys must be sorted lexicographically");
}
