use xllm_core::config::BuildConfig;
use xllm_core::document::DocumentRecord;
use xllm_core::knowledge::{KnowledgeBaseSnapshot, SnapshotIndex, TableBuilder};
use xllm_core::query::QueryEngine;
use xllm_core::types::QueryRequest;

fn make_record(source_id: &str, category: &str, text: &str) -> DocumentRecord {
    DocumentRecord::new(source_id, category, text)
}

fn build(records: Vec<DocumentRecord>) -> KnowledgeBaseSnapshot {
    TableBuilder::new(BuildConfig::v0()).build(records).unwrap()
}

fn machine_learning_corpus() -> KnowledgeBaseSnapshot {
    build(vec![
        make_record(
            "ml/intro",
            "ai",
            "machine learning models use machine learning methods",
        ),
        make_record("home/repair", "home", "washing machine repair"),
    ])
}

#[test]
fn scenario_single_document_is_found() {
    let snapshot = build(vec![make_record(
        "doc1",
        "ai",
        "deep learning uses neural networks",
    )]);
    let engine = QueryEngine::for_snapshot(&snapshot);

    let results = engine.query("deep learning", &snapshot, 1).unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].source_id, "doc1");
    assert!(results[0].score > 0.0);
    assert_eq!(results[0].category, "ai");
    assert_eq!(results[0].snippet, "deep learning uses neural networks");
}

#[test]
fn scenario_category_hint_ranks_matching_category_first() {
    let snapshot = build(vec![
        make_record("tech", "tech", "nvidia gpu architecture"),
        make_record("fin", "finance", "nvidia revenue growth"),
    ]);
    let engine = QueryEngine::for_snapshot(&snapshot);

    let request = QueryRequest::new("nvidia", 10).with_category("finance");
    let results = engine.query_request(&request, &snapshot).unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].source_id, "fin");
    assert_eq!(results[1].source_id, "tech");
    assert!(results[0].score > results[1].score);
    assert!(results[0].why.category_match);
    assert!(!results[1].why.category_match);
}

#[test]
fn scenario_unknown_token_returns_empty() {
    let snapshot = machine_learning_corpus();
    let engine = QueryEngine::for_snapshot(&snapshot);

    let results = engine.query("quantum", &snapshot, 5).unwrap();
    assert!(results.is_empty());
}

#[test]
fn empty_query_returns_empty() {
    let snapshot = machine_learning_corpus();
    let engine = QueryEngine::for_snapshot(&snapshot);

    assert!(engine.query("", &snapshot, 5).unwrap().is_empty());
    assert!(engine.query("   \n\t", &snapshot, 5).unwrap().is_empty());
}

#[test]
fn stop_word_query_returns_empty() {
    let snapshot = machine_learning_corpus();
    let engine = QueryEngine::for_snapshot(&snapshot);

    let results = engine.query("the and of", &snapshot, 5).unwrap();
    assert!(results.is_empty());
}

#[test]
fn zero_top_k_returns_empty() {
    let snapshot = machine_learning_corpus();
    let engine = QueryEngine::for_snapshot(&snapshot);

    assert!(engine.query("machine", &snapshot, 0).unwrap().is_empty());
}

#[test]
fn top_k_truncates_ranked_results() {
    let snapshot = machine_learning_corpus();
    let engine = QueryEngine::for_snapshot(&snapshot);

    let all = engine.query("machine", &snapshot, 10).unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].source_id, "ml/intro");

    let top = engine.query("machine", &snapshot, 1).unwrap();
    assert_eq!(top.len(), 1);
    assert_eq!(top[0], all[0]);
}

#[test]
fn invariant_multitoken_query_scores_at_least_single_token_query() {
    let snapshot = machine_learning_corpus();
    assert!(
        snapshot.dictionary.id_of("machine~learning").is_some(),
        "corpus should promote machine~learning"
    );
    let engine = QueryEngine::for_snapshot(&snapshot);

    let score_for = |text: &str| {
        engine
            .query(text, &snapshot, 10)
            .unwrap()
            .into_iter()
            .find(|r| r.source_id == "ml/intro")
            .map(|r| r.score)
            .unwrap_or(0.0)
    };

    let single = score_for("machine");
    let phrase = score_for("machine learning");

    assert!(single > 0.0);
    assert!(phrase >= single, "phrase {phrase} < single {single}");
}

#[test]
fn multitoken_match_is_explained() {
    let snapshot = machine_learning_corpus();
    let engine = QueryEngine::for_snapshot(&snapshot);

    let results = engine.query("machine learning", &snapshot, 10).unwrap();

    assert_eq!(results[0].source_id, "ml/intro");
    assert!(results[0].why.multitoken_score > 0.0);
    assert!(results[0]
        .why
        .matched_terms
        .iter()
        .any(|t| t == "machine~learning"));
}

#[test]
fn query_is_deterministic() {
    let snapshot = machine_learning_corpus();
    let engine = QueryEngine::for_snapshot(&snapshot);

    let first = engine.query("machine learning repair", &snapshot, 10).unwrap();
    let second = engine.query("machine learning repair", &snapshot, 10).unwrap();

    assert!(!first.is_empty());
    assert_eq!(first, second);
}

#[test]
fn misspelled_query_is_corrected_against_dictionary() {
    let snapshot = machine_learning_corpus();
    let engine = QueryEngine::for_snapshot(&snapshot);

    let corrected = engine.query("machin", &snapshot, 10).unwrap();
    let exact = engine.query("machine", &snapshot, 10).unwrap();

    assert!(!corrected.is_empty());
    assert_eq!(corrected, exact);
}

#[test]
fn equal_scores_prefer_shorter_source_id() {
    let snapshot = build(vec![
        make_record("cluster/overview", "hw", "gpu cluster"),
        make_record("c1", "hw", "gpu cluster"),
    ]);
    let engine = QueryEngine::for_snapshot(&snapshot);

    let results = engine.query("gpu", &snapshot, 10).unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].score, results[1].score);
    assert_eq!(results[0].source_id, "c1");
    assert_eq!(results[1].source_id, "cluster/overview");
}

#[test]
fn equal_scores_and_lengths_prefer_ingestion_order() {
    let snapshot = build(vec![
        make_record("bb", "hw", "gpu cluster"),
        make_record("aa", "hw", "gpu cluster"),
    ]);
    let engine = QueryEngine::for_snapshot(&snapshot);

    let results = engine.query("gpu", &snapshot, 10).unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].source_id, "bb");
    assert_eq!(results[1].source_id, "aa");
}

#[test]
fn results_carry_title_and_snippet() {
    let snapshot = TableBuilder::new(BuildConfig {
        snippet_chars: 12,
        ..BuildConfig::v0()
    })
    .build(vec![make_record("page", "docs", "tensor cores accelerate training")
        .with_title("Tensor Cores")])
    .unwrap();
    let engine = QueryEngine::for_snapshot(&snapshot);

    let results = engine.query("tensor", &snapshot, 1).unwrap();

    assert_eq!(results[0].title.as_deref(), Some("Tensor Cores"));
    assert_eq!(results[0].snippet, "tensor cores");
}

#[test]
fn lookup_summarizes_recognized_units() {
    let snapshot = machine_learning_corpus();
    let engine = QueryEngine::for_snapshot(&snapshot);

    let summaries = engine.lookup("machine learning", &snapshot, 5).unwrap();

    assert_eq!(summaries.len(), 1);
    let summary = &summaries[0];
    assert_eq!(summary.surface, "machine~learning");
    assert_eq!(summary.sources, vec![("ml/intro".to_string(), 2)]);
    assert_eq!(summary.categories, vec![("ai".to_string(), 2)]);
    assert!(!summary.variants.is_empty());

    let machine = engine.lookup("machine", &snapshot, 5).unwrap();
    assert_eq!(machine[0].sources[0], ("ml/intro".to_string(), 2));
    assert_eq!(machine[0].sources[1], ("home/repair".to_string(), 1));
    assert!(machine[0]
        .linked_words
        .iter()
        .any(|(word, _)| word == "learning"));
}

#[test]
fn invariant_known_plural_matches_its_own_documents() {
    // "networks" is indexed before "network" exists, so it stays a plural.
    let snapshot = build(vec![
        make_record("d1", "ai", "neural networks"),
        make_record("d2", "ai", "network protocol"),
    ]);
    assert!(snapshot.dictionary.id_of("networks").is_some());
    assert!(snapshot.dictionary.id_of("network").is_some());
    let engine = QueryEngine::for_snapshot(&snapshot);

    let plural = engine.query("networks", &snapshot, 10).unwrap();
    assert_eq!(plural[0].source_id, "d1");
    assert!(plural[0].why.term_score > 0.0);
    assert!(plural
        .iter()
        .filter(|r| r.source_id != "d1")
        .all(|r| r.why.term_score == 0.0));

    let singular = engine.query("network", &snapshot, 10).unwrap();
    assert_eq!(singular[0].source_id, "d2");
}

#[test]
fn snapshot_index_links_only_close_partners() {
    let snapshot = build(vec![make_record("greek", "ai", "alpha beta gamma delta epsilon")]);
    let index = SnapshotIndex::build(&snapshot);
    let id = |surface: &str| snapshot.dictionary.id_of(surface).unwrap();

    let mut partners: Vec<_> = index.links(id("alpha")).iter().map(|(p, _)| *p).collect();
    partners.sort();
    let mut close = vec![id("beta"), id("gamma")];
    close.sort();

    // delta and epsilon sit beyond the near distance.
    assert_eq!(partners, close);
    assert!(index.links(id("alpha")).iter().all(|(_, score)| *score > 0.0));
    assert!(index.segmenter().is_empty());
}

#[test]
fn invariant_indexed_query_matches_one_off_query() {
    let snapshot = machine_learning_corpus();
    let engine = QueryEngine::for_snapshot(&snapshot);
    let index = SnapshotIndex::build(&snapshot);

    for text in ["machine learning", "washing machine", "learning models", "repair"] {
        let request = QueryRequest::new(text, 10);
        assert_eq!(
            engine.query_indexed(&request, &snapshot, &index).unwrap(),
            engine.query_request(&request, &snapshot).unwrap()
        );
    }
}
