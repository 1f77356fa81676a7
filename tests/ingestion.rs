use std::fs;
use std::io::{self, BufReader, Cursor, Read};
use std::path::Path;

use tempfile::tempdir;
use xllm_core::config::BuildConfig;
use xllm_core::document::{DocumentRecord, Ingestible, IngestError, JsonLinesSource};
use xllm_core::knowledge::{BuildError, TableBuilder};

fn make_record(source_id: &str, category: &str, text: &str) -> DocumentRecord {
    DocumentRecord::new(source_id, category, text)
}

fn crawler_output() -> Vec<u8> {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(br#"{"source_id":"a","category":"ai","text":"neural networks"}"#);
    bytes.extend_from_slice(b"\n\n");
    bytes.extend_from_slice(b"{not json\n");
    bytes.extend_from_slice(b"\xff\xfe\n");
    bytes.extend_from_slice(
        br#"{"source_id":"b","category":"ai","title":"Descent","text":"gradient descent"}"#,
    );
    bytes.push(b'\n');
    bytes.extend_from_slice(br#"{"source_id":"a","category":"ops","text":"duplicate"}"#);
    bytes.push(b'\n');
    bytes.extend_from_slice(br#"{"source_id":"  ","category":"ai","text":"no id"}"#);
    bytes
}

struct FailingReader;

impl Read for FailingReader {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::Other, "disk went away"))
    }
}

#[test]
fn json_lines_skip_blank_lines_and_report_bad_ones() {
    let records: Vec<_> = JsonLinesSource::new(Cursor::new(crawler_output()), "crawl.jsonl")
        .records()
        .collect();

    assert_eq!(records.len(), 6);
    assert_eq!(records[0].as_ref().unwrap().source_id, "a");
    assert_eq!(records[3].as_ref().unwrap().title.as_deref(), Some("Descent"));

    match &records[1] {
        Err(IngestError::MalformedInput { source_id, .. }) => {
            assert_eq!(source_id, "crawl.jsonl:3")
        }
        other => panic!("expected MalformedInput, got {other:?}"),
    }
    match &records[2] {
        Err(IngestError::MalformedInput { source_id, reason }) => {
            assert_eq!(source_id, "crawl.jsonl:4");
            assert!(reason.contains("UTF-8"));
        }
        other => panic!("expected MalformedInput, got {other:?}"),
    }
}

#[test]
fn build_skips_malformed_and_duplicate_records() {
    let source = JsonLinesSource::new(Cursor::new(crawler_output()), "crawl.jsonl");
    let (snapshot, report) = TableBuilder::new(BuildConfig::v0())
        .build_with_report(source)
        .unwrap();

    assert_eq!(report.records_seen, 6);
    assert_eq!(report.records_indexed, 2);
    assert_eq!(report.skipped_malformed, 3);
    assert_eq!(report.skipped_duplicate, 1);

    assert_eq!(snapshot.document_count(), 2);
    assert_eq!(snapshot.url_map.sources[0].source_id, "a");
    assert_eq!(snapshot.url_map.sources[0].category, "ai");
    assert!(snapshot.dictionary.id_of("duplicate").is_none());
}

#[test]
fn invariant_first_record_wins_for_duplicate_source_ids() {
    let snapshot = TableBuilder::new(BuildConfig::v0())
        .build(vec![
            make_record("doc", "ai", "first version"),
            make_record("doc", "ai", "second version"),
        ])
        .unwrap();

    assert_eq!(snapshot.document_count(), 1);
    assert!(snapshot.dictionary.id_of("first").is_some());
    assert!(snapshot.dictionary.id_of("second").is_none());
}

#[test]
fn pre_parsed_failures_are_skipped() {
    let (_, report) = TableBuilder::new(BuildConfig::v0())
        .build_with_report(vec![
            Ok(make_record("a", "ai", "neural networks")),
            Err(IngestError::malformed("scan.pdf", "no text layer")),
            DocumentRecord::from_bytes("bin", "ai", vec![0xff, 0x00, 0xfe]),
        ])
        .unwrap();

    assert_eq!(report.records_seen, 3);
    assert_eq!(report.records_indexed, 1);
    assert_eq!(report.skipped_malformed, 2);
}

#[test]
fn from_bytes_rejects_non_text() {
    match DocumentRecord::from_bytes("bin", "ai", vec![0xc3, 0x28]) {
        Err(IngestError::MalformedInput { source_id, .. }) => assert_eq!(source_id, "bin"),
        other => panic!("expected MalformedInput, got {other:?}"),
    }

    let record = DocumentRecord::from_bytes("txt", "ai", "café".as_bytes().to_vec()).unwrap();
    assert_eq!(record.text, "café");
}

#[test]
fn empty_corpus_builds_empty_snapshot() {
    let snapshot = TableBuilder::new(BuildConfig::v0())
        .build(Vec::<DocumentRecord>::new())
        .unwrap();

    assert_eq!(snapshot.document_count(), 0);
    assert!(snapshot.dictionary.is_empty());
    assert!(snapshot.validate().is_ok());
}

#[test]
fn read_failure_aborts_build() {
    let source = JsonLinesSource::new(BufReader::new(FailingReader), "broken");

    match TableBuilder::new(BuildConfig::v0()).build(source) {
        Err(BuildError::Ingest(IngestError::Io(e))) => assert_eq!(e.kind(), io::ErrorKind::Other),
        Err(other) => panic!("expected Io, got {other:?}"),
        Ok(_) => panic!("build must fail"),
    }
}

#[test]
fn open_reads_json_lines_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("records.jsonl");
    fs::write(
        &path,
        "{\"source_id\":\"x\",\"category\":\"ai\",\"text\":\"sparse attention\"}\n",
    )
    .unwrap();

    let snapshot = TableBuilder::new(BuildConfig::v0())
        .build(JsonLinesSource::open(&path).unwrap())
        .unwrap();
    assert_eq!(snapshot.url_map.sources[0].source_id, "x");

    assert!(matches!(
        JsonLinesSource::open(Path::new("/nonexistent/records.jsonl")),
        Err(IngestError::Io(_))
    ));
}
