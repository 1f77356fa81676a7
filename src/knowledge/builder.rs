use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::dictionary::Dictionary;
use super::snapshot::{KnowledgeBaseSnapshot, SNAPSHOT_FORMAT_VERSION};
use super::tables::{ngrams_from_dictionary, CategoryTable, SourceEntry, UrlMap, WordHash};
use crate::association::{dominant_categories, AssociationEngine, AssociationKind, Embeddings};
use crate::compress::{CompressError, Compressor};
use crate::config::{tokenizer_fingerprint, BuildConfig, ConfigError};
use crate::document::{DocumentRecord, IngestError, Ingestible};
use crate::multitoken::{MultitokenDetector, MultitokenIndex};
use crate::normalize::{Normalizer, StandardNormalizer};
use crate::types::identifiers::{Fingerprint, SourceIndex, TokenId};

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Ingestion failed: {0}")]
    Ingest(#[from] IngestError),
    #[error("Compression failed: {0}")]
    Compress(#[from] CompressError),
    #[error("Invalid build configuration: {0}")]
    Config(#[from] ConfigError),
}

/// Counters describing one build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildReport {
    pub records_seen: usize,
    pub records_indexed: usize,
    pub skipped_malformed: usize,
    pub skipped_duplicate: usize,
    pub tokens: usize,
    pub multitokens: usize,
    pub related_pairs: usize,
    pub distant_pairs: usize,
    pub see_also_pairs: usize,
}

/// A record that survived ingestion, with its raw single-token stream.
struct Ingested {
    record: DocumentRecord,
    tokens: Vec<TokenId>,
}

/// Compiles document records into a `KnowledgeBaseSnapshot`.
///
/// The build is a fixed sequence of phases over the records in input
/// order; the same records and configuration give the same snapshot.
pub struct TableBuilder<N = StandardNormalizer> {
    config: BuildConfig,
    normalizer: N,
}

impl TableBuilder<StandardNormalizer> {
    pub fn new(config: BuildConfig) -> Self {
        let normalizer = StandardNormalizer::new(config.tokenizer.normalizer.clone());
        Self { config, normalizer }
    }
}

impl Default for TableBuilder<StandardNormalizer> {
    fn default() -> Self {
        Self::new(BuildConfig::v0())
    }
}

impl<N: Normalizer> TableBuilder<N> {
    pub fn with_normalizer(config: BuildConfig, normalizer: N) -> Self {
        Self { config, normalizer }
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    pub fn fingerprint(&self) -> Fingerprint {
        tokenizer_fingerprint(&self.normalizer, &self.config.tokenizer.multitoken)
    }

    pub fn build(&self, source: impl Ingestible) -> Result<KnowledgeBaseSnapshot, BuildError> {
        self.build_with_report(source).map(|(snapshot, _)| snapshot)
    }

    pub fn build_with_report(
        &self,
        source: impl Ingestible,
    ) -> Result<(KnowledgeBaseSnapshot, BuildReport), BuildError> {
        self.config.validate()?;
        let mut report = BuildReport::default();
        let mut dictionary = Dictionary::new();

        // 1. Normalize records against the running vocabulary.
        let (ingested, pair_counts) = self.ingest(source, &mut dictionary, &mut report)?;
        report.tokens = dictionary.len();
        info!(
            records = report.records_indexed,
            skipped = report.skipped_malformed + report.skipped_duplicate,
            tokens = report.tokens,
            "normalization finished"
        );

        // 2. Promote multitokens.
        let streams: Vec<Vec<TokenId>> = ingested.iter().map(|i| i.tokens.clone()).collect();
        let detector = MultitokenDetector::new(self.config.tokenizer.multitoken.clone());
        for candidate in detector.detect(&streams) {
            if dictionary
                .insert_multitoken(candidate.constituents, candidate.count)
                .is_some()
            {
                report.multitokens += 1;
            }
        }
        info!(multitokens = report.multitokens, "multitoken detection finished");

        // 3. Segment every stream and fill postings and the URL map.
        let index = MultitokenIndex::build(&dictionary, &self.config.tokenizer.multitoken);
        let mut url_map = UrlMap::default();
        let mut unit_streams: Vec<Vec<TokenId>> = Vec::with_capacity(ingested.len());

        for (position, item) in ingested.iter().enumerate() {
            let source = SourceIndex::new(position as u32);
            let segments = index.segment_ids(&item.tokens, &dictionary);

            for id in &item.tokens {
                url_map.add_occurrences(*id, source, 1);
            }
            for segment in segments.iter().filter(|s| s.is_multitoken()) {
                url_map.add_occurrences(segment.id, source, 1);
            }

            url_map.sources.push(SourceEntry {
                source_id: item.record.source_id.clone(),
                category: item.record.category.clone(),
                title: item.record.title.clone(),
                breadcrumb: item.record.breadcrumb.clone(),
                snippet: item.record.text.chars().take(self.config.snippet_chars).collect(),
                token_count: segments.len(),
            });
            unit_streams.push(segments.iter().map(|s| s.id).collect());
        }

        let mut hash_category = CategoryTable::new();
        for (id, postings) in &url_map.postings {
            if let Some(entry) = dictionary.entry_mut(*id) {
                entry.document_frequency = postings.len() as u64;
            }
            let categories = hash_category.entry(*id).or_default();
            for (source, count) in postings {
                if let Some(entry) = url_map.sources.get(source.index()) {
                    *categories.entry(entry.category.clone()).or_insert(0) += count;
                }
            }
        }
        debug!(postings = url_map.postings.len(), "segmentation finished");

        // 4. Associations.
        let engine = AssociationEngine::new(self.config.association.clone());
        let dominant = dominant_categories(&hash_category);
        let hash_related = engine.score_pairs(&unit_streams, &dominant);
        let links = self.see_also_links(&ingested, &unit_streams, &dictionary, &index);
        let hash_see = engine.see_also_pairs(links);

        report.related_pairs = hash_related.count_kind(AssociationKind::Related);
        report.distant_pairs = hash_related.count_kind(AssociationKind::Distant);
        report.see_also_pairs = hash_see.len();
        info!(
            related = report.related_pairs,
            distant = report.distant_pairs,
            see_also = report.see_also_pairs,
            "association scoring finished"
        );

        // 5. Embeddings.
        let embeddings = Embeddings::build(&dictionary, &hash_related, &self.config.embedding);

        // 6. N-grams and the word-hash.
        let ngrams = ngrams_from_dictionary(&dictionary);
        let word_hash = self.word_hash(&pair_counts, &dictionary);

        // 7. Compression.
        let compressed = Compressor::compress(&dictionary, &ngrams, &word_hash)?;

        let snapshot = KnowledgeBaseSnapshot {
            format_version: SNAPSHOT_FORMAT_VERSION,
            config: self.config.clone(),
            config_fingerprint: self.fingerprint(),
            dictionary,
            embeddings,
            word_hash,
            hash_see,
            hash_related,
            hash_category,
            ngrams,
            compressed,
            url_map,
        };

        info!(
            documents = snapshot.document_count(),
            dictionary = snapshot.dictionary.len(),
            fingerprint = %snapshot.config_fingerprint,
            "build finished"
        );

        Ok((snapshot, report))
    }

    /// Phase 1: read records, skip the unusable ones, assign single-token
    /// ids and count adjacent pairs for the word-hash.
    fn ingest(
        &self,
        source: impl Ingestible,
        dictionary: &mut Dictionary,
        report: &mut BuildReport,
    ) -> Result<(Vec<Ingested>, BTreeMap<(TokenId, TokenId), u64>), BuildError> {
        let mut ingested = Vec::new();
        let mut seen_sources: HashSet<String> = HashSet::new();
        let mut pair_counts: BTreeMap<(TokenId, TokenId), u64> = BTreeMap::new();

        for item in source.records() {
            report.records_seen += 1;

            let record = match item.and_then(|r| r.check().map(|_| r)) {
                Ok(record) => record,
                Err(e) if e.is_recoverable() => {
                    warn!(error = %e, "skipping malformed record");
                    report.skipped_malformed += 1;
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            if !seen_sources.insert(record.source_id.clone()) {
                warn!(source_id = %record.source_id, "source already in knowledge base, skipping");
                report.skipped_duplicate += 1;
                continue;
            }

            let mut surfaces = Vec::new();
            if let Some(title) = &record.title {
                surfaces.extend(self.normalizer.normalize(title, &*dictionary));
            }
            surfaces.extend(self.normalizer.normalize(&record.text, &*dictionary));

            let mut tokens = Vec::with_capacity(surfaces.len());
            for surface in &surfaces {
                let id = dictionary.intern(surface);
                if let Some(entry) = dictionary.entry_mut(id) {
                    entry.collection_frequency += 1;
                }
                tokens.push(id);
            }

            for pair in tokens.windows(2) {
                if pair[0] != pair[1] {
                    *pair_counts.entry((pair[0], pair[1])).or_insert(0) += 1;
                    *pair_counts.entry((pair[1], pair[0])).or_insert(0) += 1;
                }
            }

            report.records_indexed += 1;
            ingested.push(Ingested { record, tokens });
        }

        Ok((ingested, pair_counts))
    }

    /// Resolve record cross-references into `(anchor, reference)` unit pairs.
    ///
    /// Anchors are the title units, or the record's distinct units when it
    /// has no title. Each record asserts a given pair at most once.
    fn see_also_links(
        &self,
        ingested: &[Ingested],
        unit_streams: &[Vec<TokenId>],
        dictionary: &Dictionary,
        index: &MultitokenIndex,
    ) -> Vec<(TokenId, TokenId)> {
        let mut links = Vec::new();

        for (item, units) in ingested.iter().zip(unit_streams) {
            if item.record.see_also.is_empty() {
                continue;
            }

            let anchors: BTreeSet<TokenId> = match &item.record.title {
                Some(title) => self.units_of(title, dictionary, index).into_iter().collect(),
                None => units.iter().copied().collect(),
            };

            let mut asserted: BTreeSet<(TokenId, TokenId)> = BTreeSet::new();
            for reference in &item.record.see_also {
                for target in self.units_of(reference, dictionary, index) {
                    for anchor in &anchors {
                        if *anchor != target {
                            asserted.insert((*anchor.min(&target), *anchor.max(&target)));
                        }
                    }
                }
            }
            links.extend(asserted);
        }

        links
    }

    fn units_of(
        &self,
        text: &str,
        dictionary: &Dictionary,
        index: &MultitokenIndex,
    ) -> Vec<TokenId> {
        let known: Vec<Option<TokenId>> = self
            .normalizer
            .normalize(text, dictionary)
            .iter()
            .map(|surface| dictionary.id_of(surface))
            .collect();
        index.segment(&known, dictionary).into_iter().map(|s| s.id).collect()
    }

    fn word_hash(
        &self,
        pair_counts: &BTreeMap<(TokenId, TokenId), u64>,
        dictionary: &Dictionary,
    ) -> WordHash {
        let min_count = self.config.association.min_pair_frequency.max(1);
        let mut word_hash = WordHash::new();

        for (&(x, y), &count) in pair_counts {
            if count < min_count {
                continue;
            }
            if let (Some(sx), Some(sy)) = (dictionary.surface(x), dictionary.surface(y)) {
                word_hash
                    .entry(sx.to_string())
                    .or_default()
                    .insert(sy.to_string(), count);
            }
        }
        word_hash
    }
}
