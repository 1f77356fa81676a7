use std::collections::HashMap;

use tracing::debug;

use super::MultitokenConfig;
use crate::association::pmi::smoothed_pmi;
use crate::types::identifiers::TokenId;

/// An adjacent n-gram that passed both promotion thresholds.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub constituents: Vec<TokenId>,
    pub count: u64,
    pub pmi: f64,
}

struct NgramStats {
    count: u64,
    first_seen: (usize, usize),
}

pub struct MultitokenDetector {
    config: MultitokenConfig,
}

impl MultitokenDetector {
    pub fn new(config: MultitokenConfig) -> Self {
        Self { config }
    }

    /// Scan per-document token streams and return the n-grams to promote,
    /// in order of first occurrence. Both the count and the smoothed PMI
    /// must exceed their thresholds.
    ///
    /// N-grams never span two documents.
    pub fn detect(&self, streams: &[Vec<TokenId>]) -> Vec<Candidate> {
        let max_len = self.config.max_len.clamp(2, 3);

        let mut unigrams: HashMap<TokenId, u64> = HashMap::new();
        let mut ngrams: HashMap<&[TokenId], NgramStats> = HashMap::new();
        let mut total: u64 = 0;

        for (doc, stream) in streams.iter().enumerate() {
            for (pos, id) in stream.iter().enumerate() {
                *unigrams.entry(*id).or_insert(0) += 1;
                total += 1;

                for len in 2..=max_len {
                    let Some(window) = stream.get(pos..pos + len) else {
                        break;
                    };
                    ngrams
                        .entry(window)
                        .or_insert(NgramStats {
                            count: 0,
                            first_seen: (doc, pos),
                        })
                        .count += 1;
                }
            }
        }

        let vocabulary = unigrams.len() as u64;
        let mut promoted: Vec<((usize, usize), Candidate)> = ngrams
            .into_iter()
            .filter(|(_, stats)| stats.count > self.config.frequency_threshold)
            .filter_map(|(window, stats)| {
                let marginals: Vec<u64> = window
                    .iter()
                    .map(|id| unigrams.get(id).copied().unwrap_or(0))
                    .collect();
                let pmi = smoothed_pmi(stats.count, &marginals, total, vocabulary);
                (pmi > self.config.association_threshold).then(|| {
                    (
                        stats.first_seen,
                        Candidate {
                            constituents: window.to_vec(),
                            count: stats.count,
                            pmi,
                        },
                    )
                })
            })
            .collect();

        // Same start position: shorter n-gram first, it was completed first.
        promoted.sort_by(|(a_seen, a), (b_seen, b)| {
            a_seen
                .cmp(b_seen)
                .then_with(|| a.constituents.len().cmp(&b.constituents.len()))
        });

        debug!(candidates = promoted.len(), total_tokens = total, "multitoken detection finished");

        promoted.into_iter().map(|(_, c)| c).collect()
    }
}
