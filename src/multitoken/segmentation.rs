use std::cmp::Ordering;
use std::collections::HashMap;

use super::MultitokenConfig;
use crate::knowledge::dictionary::{Dictionary, DictionaryEntry};
use crate::types::identifiers::TokenId;

/// One recognized unit of a segmented token sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub id: TokenId,
    pub start: usize,
    pub len: usize,
}

impl Segment {
    pub fn is_multitoken(&self) -> bool {
        self.len > 1
    }
}

/// Lookup of multitokens by their constituent multiset.
///
/// Built from a dictionary; the same index type serves build-time and
/// query-time segmentation.
#[derive(Debug, Clone, Default)]
pub struct MultitokenIndex {
    by_key: HashMap<Vec<TokenId>, Vec<TokenId>>,
    max_len: usize,
    match_permutations: bool,
}

fn sorted_key(ids: &[TokenId]) -> Vec<TokenId> {
    let mut key = ids.to_vec();
    key.sort_unstable();
    key
}

/// Higher collection frequency first, then the lexicographically smaller surface.
fn preference(a: &DictionaryEntry, b: &DictionaryEntry) -> Ordering {
    b.collection_frequency
        .cmp(&a.collection_frequency)
        .then_with(|| a.surface.cmp(&b.surface))
}

impl MultitokenIndex {
    pub fn build(dictionary: &Dictionary, config: &MultitokenConfig) -> Self {
        let mut by_key: HashMap<Vec<TokenId>, Vec<TokenId>> = HashMap::new();
        let mut max_len = 1;

        for entry in dictionary.multitokens() {
            max_len = max_len.max(entry.constituents.len());
            by_key
                .entry(sorted_key(&entry.constituents))
                .or_default()
                .push(entry.id);
        }

        Self {
            by_key,
            max_len,
            match_permutations: config.match_permutations,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    fn best_match<'d>(
        &self,
        window: &[TokenId],
        dictionary: &'d Dictionary,
    ) -> Option<&'d DictionaryEntry> {
        let bucket = self.by_key.get(&sorted_key(window))?;
        bucket
            .iter()
            .filter_map(|id| dictionary.get(*id))
            .filter(|entry| self.match_permutations || entry.constituents == window)
            .min_by(|a, b| preference(a, b))
    }

    /// Greedy longest-match segmentation.
    ///
    /// `None` marks a token unknown to the dictionary: it is dropped and no
    /// multitoken may span it. At each position the longest matching
    /// multitoken wins; equal-length candidates resolve by frequency, then
    /// surface. Otherwise the single token is emitted.
    pub fn segment(&self, units: &[Option<TokenId>], dictionary: &Dictionary) -> Vec<Segment> {
        let mut segments = Vec::with_capacity(units.len());
        let mut pos = 0;

        while pos < units.len() {
            let Some(single) = units[pos] else {
                pos += 1;
                continue;
            };

            let mut matched = None;
            for len in (2..=self.max_len).rev() {
                let Some(window) = units.get(pos..pos + len) else {
                    continue;
                };
                let window: Option<Vec<TokenId>> = window.iter().copied().collect();
                let Some(window) = window else {
                    continue;
                };
                if let Some(entry) = self.best_match(&window, dictionary) {
                    matched = Some(Segment {
                        id: entry.id,
                        start: pos,
                        len,
                    });
                    break;
                }
            }

            let segment = matched.unwrap_or(Segment {
                id: single,
                start: pos,
                len: 1,
            });
            pos += segment.len;
            segments.push(segment);
        }

        segments
    }

    /// Segment a fully known id stream.
    pub fn segment_ids(&self, ids: &[TokenId], dictionary: &Dictionary) -> Vec<Segment> {
        let units: Vec<Option<TokenId>> = ids.iter().copied().map(Some).collect();
        self.segment(&units, dictionary)
    }
}
