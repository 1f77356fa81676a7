//! Free-text retrieval against a `KnowledgeBaseSnapshot`.
//!
//! The query is tokenized exactly like the build tokenized its records,
//! which is enforced through the tokenizer fingerprint stored in the
//! snapshot. Scoring reads the snapshot only, so any number of queries can
//! run against the same snapshot at once.

pub mod ranking;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tracing::debug;

use crate::config::{tokenizer_fingerprint, BuildConfig, QueryConfig};
use crate::knowledge::{KnowledgeBaseSnapshot, SnapshotIndex, TokenSummary};
use crate::multitoken::MultitokenConfig;
use crate::normalize::{Normalizer, StandardNormalizer};
use crate::store::LiveSnapshot;
use crate::types::identifiers::{Fingerprint, SourceIndex, TokenId};
use crate::types::query_result::{
    QueryError, QueryRequest, ResultWhy, ScoreDetails, ScoredResult,
};

pub use ranking::{rank, RankedSource, Scorer, WeightedScorer};

/// Anything that answers free-text queries with ranked sources.
pub trait Queryable {
    fn query(&self, text: &str, top_k: usize) -> Result<Vec<ScoredResult>, QueryError>;
}

/// Units recognized in a query.
#[derive(Debug, Default)]
struct Recognized {
    /// Matched units in query order, without repeats.
    units: Vec<TokenId>,
    /// Matched units plus the constituents of matched multitokens.
    terms: BTreeSet<TokenId>,
    /// Matched multitokens.
    multitokens: BTreeSet<TokenId>,
}

pub struct QueryEngine<N = StandardNormalizer, S = WeightedScorer> {
    normalizer: N,
    scorer: S,
    fingerprint: Fingerprint,
}

impl QueryEngine<StandardNormalizer, WeightedScorer> {
    pub fn from_config(build: &BuildConfig, query: &QueryConfig) -> Self {
        Self::new(
            StandardNormalizer::new(build.tokenizer.normalizer.clone()),
            &build.tokenizer.multitoken,
            WeightedScorer::new(query.weights),
        )
    }

    /// An engine tokenizing the way `snapshot` was built, with default weights.
    pub fn for_snapshot(snapshot: &KnowledgeBaseSnapshot) -> Self {
        Self::from_config(&snapshot.config, &QueryConfig::default())
    }
}

impl<N, S> QueryEngine<N, S>
where
    N: Normalizer,
    S: Scorer,
{
    pub fn new(normalizer: N, multitoken: &MultitokenConfig, scorer: S) -> Self {
        let fingerprint = tokenizer_fingerprint(&normalizer, multitoken);
        Self {
            normalizer,
            scorer,
            fingerprint,
        }
    }

    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    pub fn check_compatible(&self, snapshot: &KnowledgeBaseSnapshot) -> Result<(), QueryError> {
        if snapshot.config_fingerprint != self.fingerprint {
            return Err(QueryError::ConfigMismatch {
                expected: snapshot.config_fingerprint.clone(),
                found: self.fingerprint.clone(),
            });
        }
        Ok(())
    }

    pub fn query(
        &self,
        text: &str,
        snapshot: &KnowledgeBaseSnapshot,
        top_k: usize,
    ) -> Result<Vec<ScoredResult>, QueryError> {
        self.query_request(&QueryRequest::new(text, top_k), snapshot)
    }

    /// Run one request, deriving the query index on the spot. Callers issuing
    /// many queries against one snapshot should build a `SnapshotIndex` once
    /// and use `query_indexed`.
    pub fn query_request(
        &self,
        request: &QueryRequest,
        snapshot: &KnowledgeBaseSnapshot,
    ) -> Result<Vec<ScoredResult>, QueryError> {
        self.check_compatible(snapshot)?;
        self.query_indexed(request, snapshot, &SnapshotIndex::build(snapshot))
    }

    /// Run one request with an index built from `snapshot`.
    pub fn query_indexed(
        &self,
        request: &QueryRequest,
        snapshot: &KnowledgeBaseSnapshot,
        index: &SnapshotIndex,
    ) -> Result<Vec<ScoredResult>, QueryError> {
        self.check_compatible(snapshot)?;

        let recognized = self.recognize(&request.text, snapshot, index);
        if recognized.terms.is_empty() || request.top_k == 0 {
            debug!(query = %request.text, "no recognized tokens");
            return Ok(Vec::new());
        }

        let category = match &request.category_hint {
            Some(hint) => Some(hint.clone()),
            None => infer_category(&recognized.terms, snapshot),
        };

        let mut candidates: BTreeMap<SourceIndex, ScoreDetails> = BTreeMap::new();

        for id in &recognized.terms {
            for (source, tf) in snapshot.url_map.postings(*id).into_iter().flatten() {
                let details = candidates.entry(*source).or_default();
                details.term += 1.0 + (*tf as f64).ln();
                if let Some(surface) = snapshot.dictionary.surface(*id) {
                    details.matched_terms.push(surface.to_string());
                }
            }
        }

        for id in &recognized.multitokens {
            let Some(entry) = snapshot.dictionary.get(*id) else {
                continue;
            };
            let span = entry.span() as f64;
            for (source, tf) in snapshot.url_map.postings(*id).into_iter().flatten() {
                let details = candidates.entry(*source).or_default();
                details.multitoken += span * (1.0 + (*tf as f64).ln());
                details.matched_terms.push(entry.surface.clone());
            }
        }

        for id in &recognized.terms {
            for (neighbor, score) in index.links(*id) {
                for (source, _) in snapshot.url_map.postings(*neighbor).into_iter().flatten() {
                    candidates.entry(*source).or_default().association += score;
                }
            }
        }

        let ranked: Vec<RankedSource<'_>> = candidates
            .into_iter()
            .filter_map(|(source, mut details)| {
                let entry = snapshot.url_map.source(source)?;
                details.source = Some(source);
                details.category_match = category.as_deref() == Some(entry.category.as_str());
                Some(RankedSource {
                    source,
                    source_id: &entry.source_id,
                    score: self.scorer.score_value(&details),
                    details,
                })
            })
            .collect();

        let considered = ranked.len();
        let ranked = rank(ranked, request.top_k);
        debug!(
            query = %request.text,
            terms = recognized.terms.len(),
            multitokens = recognized.multitokens.len(),
            category = category.as_deref().unwrap_or(""),
            considered,
            returned = ranked.len(),
            "query scored"
        );

        Ok(ranked
            .into_iter()
            .filter_map(|r| {
                let entry = snapshot.url_map.source(r.source)?;
                Some(ScoredResult {
                    source_id: entry.source_id.clone(),
                    score: r.score,
                    title: entry.title.clone(),
                    category: entry.category.clone(),
                    snippet: entry.snippet.clone(),
                    why: ResultWhy {
                        matched_terms: r.details.matched_terms,
                        term_score: r.details.term,
                        multitoken_score: r.details.multitoken,
                        association_score: r.details.association,
                        category_match: r.details.category_match,
                    },
                })
            })
            .collect())
    }

    /// Summaries of the units recognized in `text`, in query order.
    pub fn lookup(
        &self,
        text: &str,
        snapshot: &KnowledgeBaseSnapshot,
        max_rows: usize,
    ) -> Result<Vec<TokenSummary>, QueryError> {
        self.check_compatible(snapshot)?;
        let recognized = self.recognize(text, snapshot, &SnapshotIndex::build(snapshot));
        Ok(recognized
            .units
            .iter()
            .filter_map(|id| snapshot.summarize(*id, max_rows))
            .collect())
    }

    fn recognize(
        &self,
        text: &str,
        snapshot: &KnowledgeBaseSnapshot,
        index: &SnapshotIndex,
    ) -> Recognized {
        let dictionary = &snapshot.dictionary;
        let known: Vec<Option<TokenId>> = self
            .normalizer
            .normalize(text, dictionary)
            .iter()
            .map(|surface| dictionary.id_of(surface))
            .collect();

        let mut recognized = Recognized::default();
        if known.iter().all(Option::is_none) {
            return recognized;
        }

        for segment in index.segmenter().segment(&known, dictionary) {
            if !recognized.units.contains(&segment.id) {
                recognized.units.push(segment.id);
            }
            recognized.terms.insert(segment.id);
            if let Some(entry) = dictionary.get(segment.id).filter(|e| e.is_multitoken()) {
                recognized.multitokens.insert(entry.id);
                recognized.terms.extend(entry.constituents.iter().copied());
            }
        }
        recognized
    }
}

/// Category with the largest summed count over `terms`; ties go to the
/// smallest name.
fn infer_category(terms: &BTreeSet<TokenId>, snapshot: &KnowledgeBaseSnapshot) -> Option<String> {
    let mut totals: BTreeMap<&str, u64> = BTreeMap::new();
    for id in terms {
        for (category, count) in snapshot.hash_category.get(id).into_iter().flatten() {
            *totals.entry(category.as_str()).or_insert(0) += count;
        }
    }

    let mut best: Option<(&str, u64)> = None;
    for (category, count) in totals {
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((category, count));
        }
    }
    best.map(|(category, _)| category.to_string())
}

/// A query endpoint over whatever snapshot is currently published.
pub struct ServingKnowledgeBase<N = StandardNormalizer, S = WeightedScorer> {
    engine: QueryEngine<N, S>,
    live: LiveSnapshot,
}

impl<N, S> ServingKnowledgeBase<N, S>
where
    N: Normalizer,
    S: Scorer,
{
    pub fn new(
        engine: QueryEngine<N, S>,
        snapshot: KnowledgeBaseSnapshot,
    ) -> Result<Self, QueryError> {
        engine.check_compatible(&snapshot)?;
        Ok(Self {
            engine,
            live: LiveSnapshot::new(snapshot),
        })
    }

    pub fn engine(&self) -> &QueryEngine<N, S> {
        &self.engine
    }

    pub fn snapshot(&self) -> Arc<KnowledgeBaseSnapshot> {
        self.live.current()
    }

    /// Swap in a rebuilt snapshot. Queries already running finish on the
    /// snapshot they started with.
    pub fn publish(
        &self,
        snapshot: KnowledgeBaseSnapshot,
    ) -> Result<Arc<KnowledgeBaseSnapshot>, QueryError> {
        self.engine.check_compatible(&snapshot)?;
        Ok(self.live.publish(snapshot))
    }

    pub fn query_request(&self, request: &QueryRequest) -> Result<Vec<ScoredResult>, QueryError> {
        let (snapshot, index) = self.live.current_indexed();
        self.engine.query_indexed(request, &snapshot, &index)
    }
}

impl<N, S> Queryable for ServingKnowledgeBase<N, S>
where
    N: Normalizer,
    S: Scorer,
{
    fn query(&self, text: &str, top_k: usize) -> Result<Vec<ScoredResult>, QueryError> {
        self.query_request(&QueryRequest::new(text, top_k))
    }
}
