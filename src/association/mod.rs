//! Pairwise association strength between dictionary entries.
//!
//! Scores are computed once per build from a sliding co-occurrence window
//! over the segmented document streams. Counting is sequential; scoring runs
//! on the rayon pool over the frozen counts and is collected in key order.

pub mod embeddings;
pub mod pmi;

use std::collections::{BTreeMap, HashMap};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::identifiers::TokenId;
use pmi::smoothed_pmi;

pub use embeddings::{EmbeddingConfig, Embeddings};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AssociationKind {
    Related,
    Distant,
    SeeAlso,
}

/// An unordered pair stored canonically with `a < b`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssociationPair {
    pub a: TokenId,
    pub b: TokenId,
    pub score: f64,
    pub kind: AssociationKind,
}

impl AssociationPair {
    pub fn new(x: TokenId, y: TokenId, score: f64, kind: AssociationKind) -> Self {
        let (a, b) = if x <= y { (x, y) } else { (y, x) };
        Self { a, b, score, kind }
    }

    /// The partner of `id` in this pair.
    pub fn other(&self, id: TokenId) -> Option<TokenId> {
        if self.a == id {
            Some(self.b)
        } else if self.b == id {
            Some(self.a)
        } else {
            None
        }
    }

    fn key(&self) -> (TokenId, TokenId, AssociationKind) {
        (self.a, self.b, self.kind)
    }
}

/// Association pairs sorted by `(a, b, kind)`, at most one per key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssociationTable {
    pairs: Vec<AssociationPair>,
}

impl AssociationTable {
    pub fn new(mut pairs: Vec<AssociationPair>) -> Self {
        pairs.sort_by(|x, y| x.key().cmp(&y.key()));
        pairs.dedup_by(|x, y| x.key() == y.key());
        Self { pairs }
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AssociationPair> {
        self.pairs.iter()
    }

    pub fn count_kind(&self, kind: AssociationKind) -> usize {
        self.pairs.iter().filter(|p| p.kind == kind).count()
    }

    /// Score of the pair `{x, y}` of the given kind, in either argument order.
    pub fn score(&self, x: TokenId, y: TokenId, kind: AssociationKind) -> Option<f64> {
        let target = AssociationPair::new(x, y, 0.0, kind).key();
        self.pairs
            .binary_search_by(|p| p.key().cmp(&target))
            .ok()
            .map(|i| self.pairs[i].score)
    }

    /// Adjacency view: for each id, its partners with score and kind.
    pub fn neighbors(&self) -> HashMap<TokenId, Vec<(TokenId, f64, AssociationKind)>> {
        let mut out: HashMap<TokenId, Vec<(TokenId, f64, AssociationKind)>> = HashMap::new();
        for pair in &self.pairs {
            out.entry(pair.a).or_default().push((pair.b, pair.score, pair.kind));
            out.entry(pair.b).or_default().push((pair.a, pair.score, pair.kind));
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssociationConfig {
    /// Maximum token distance of a co-occurrence.
    pub window: usize,
    /// Pairs closer than this (and sharing a dominant category) are `related`.
    pub near_distance: usize,
    pub related_threshold: f64,
    pub min_pair_frequency: u64,
}

impl Default for AssociationConfig {
    fn default() -> Self {
        Self {
            window: 5,
            near_distance: 2,
            related_threshold: 0.0,
            min_pair_frequency: 1,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct PairStats {
    count: u64,
    min_distance: usize,
}

pub struct AssociationEngine {
    config: AssociationConfig,
}

impl AssociationEngine {
    pub fn new(config: AssociationConfig) -> Self {
        Self { config }
    }

    /// Score every co-occurring pair and classify it as related or distant.
    ///
    /// `dominant_category` maps an id to its most frequent category; ids
    /// without one are never `related`.
    pub fn score_pairs(
        &self,
        streams: &[Vec<TokenId>],
        dominant_category: &HashMap<TokenId, String>,
    ) -> AssociationTable {
        let window = self.config.window.max(1);

        let mut unit_counts: HashMap<TokenId, u64> = HashMap::new();
        let mut pairs: HashMap<(TokenId, TokenId), PairStats> = HashMap::new();
        let mut total: u64 = 0;

        for stream in streams {
            for (i, a) in stream.iter().enumerate() {
                *unit_counts.entry(*a).or_insert(0) += 1;
                total += 1;

                for (offset, b) in stream.iter().skip(i + 1).take(window).enumerate() {
                    if a == b {
                        continue;
                    }
                    let distance = offset + 1;
                    let key = if a < b { (*a, *b) } else { (*b, *a) };
                    let stats = pairs.entry(key).or_insert(PairStats {
                        count: 0,
                        min_distance: distance,
                    });
                    stats.count += 1;
                    stats.min_distance = stats.min_distance.min(distance);
                }
            }
        }

        let vocabulary = unit_counts.len() as u64;

        // Frozen from here on; scoring only reads.
        let mut keyed: Vec<((TokenId, TokenId), PairStats)> = pairs
            .into_iter()
            .filter(|(_, s)| s.count >= self.config.min_pair_frequency.max(1))
            .collect();
        keyed.sort_unstable_by_key(|(key, _)| *key);

        let scored: Vec<AssociationPair> = keyed
            .par_iter()
            .filter_map(|((a, b), stats)| {
                let ca = unit_counts.get(a).copied().unwrap_or(0);
                let cb = unit_counts.get(b).copied().unwrap_or(0);
                let score = smoothed_pmi(stats.count, &[ca, cb], total, vocabulary);
                if score < self.config.related_threshold {
                    return None;
                }

                let same_category = match (dominant_category.get(a), dominant_category.get(b)) {
                    (Some(x), Some(y)) => x == y,
                    _ => false,
                };
                let kind = if same_category && stats.min_distance <= self.config.near_distance {
                    AssociationKind::Related
                } else {
                    AssociationKind::Distant
                };
                Some(AssociationPair::new(*a, *b, score, kind))
            })
            .collect();

        debug!(
            candidates = keyed.len(),
            retained = scored.len(),
            total_units = total,
            "association scoring finished"
        );

        AssociationTable::new(scored)
    }

    /// Pairs declared by explicit cross-references; the score is the number
    /// of records asserting the link.
    pub fn see_also_pairs(
        &self,
        links: impl IntoIterator<Item = (TokenId, TokenId)>,
    ) -> AssociationTable {
        let mut counts: BTreeMap<(TokenId, TokenId), u64> = BTreeMap::new();
        for (x, y) in links {
            if x == y {
                continue;
            }
            let key = if x < y { (x, y) } else { (y, x) };
            *counts.entry(key).or_insert(0) += 1;
        }

        AssociationTable::new(
            counts
                .into_iter()
                .map(|((a, b), n)| AssociationPair::new(a, b, n as f64, AssociationKind::SeeAlso))
                .collect(),
        )
    }
}

/// Most frequent category per id; ties go to the lexicographically smallest.
pub fn dominant_categories(
    hash_category: &BTreeMap<TokenId, BTreeMap<String, u64>>,
) -> HashMap<TokenId, String> {
    hash_category
        .iter()
        .filter_map(|(id, categories)| {
            let mut best: Option<(&String, u64)> = None;
            // BTreeMap iterates categories in ascending order, so only a
            // strictly larger count replaces the current best.
            for (category, count) in categories {
                if best.map_or(true, |(_, c)| *count > c) {
                    best = Some((category, *count));
                }
            }
            best.map(|(category, _)| (*id, category.clone()))
        })
        .collect()
}
