use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::identifiers::{SourceIndex, TokenId};

/// Adjacent single-token pairs with counts, keyed by surface. Symmetric.
pub type WordHash = BTreeMap<String, BTreeMap<String, u64>>;

/// Categories attached to an entry, with occurrence counts.
pub type CategoryTable = BTreeMap<TokenId, BTreeMap<String, u64>>;

/// Sorted n-gram key (constituents in lexicographic order, `~`-joined) to
/// the multitokens sharing that constituent set.
pub type NgramsTable = BTreeMap<String, Vec<NgramVariant>>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NgramVariant {
    pub surface: String,
    pub frequency: u64,
}

/// One ingested source, in ingestion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceEntry {
    pub source_id: String,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breadcrumb: Option<String>,
    pub snippet: String,
    /// Segmented units produced by the source.
    pub token_count: usize,
}

/// Sources plus per-entry postings (entry -> source -> occurrences).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UrlMap {
    pub sources: Vec<SourceEntry>,
    pub postings: BTreeMap<TokenId, BTreeMap<SourceIndex, u64>>,
}

impl UrlMap {
    pub fn source(&self, index: SourceIndex) -> Option<&SourceEntry> {
        self.sources.get(index.index())
    }

    pub fn term_frequency(&self, id: TokenId, source: SourceIndex) -> u64 {
        self.postings
            .get(&id)
            .and_then(|p| p.get(&source))
            .copied()
            .unwrap_or(0)
    }

    pub fn postings(&self, id: TokenId) -> Option<&BTreeMap<SourceIndex, u64>> {
        self.postings.get(&id)
    }

    pub(crate) fn add_occurrences(&mut self, id: TokenId, source: SourceIndex, count: u64) {
        *self
            .postings
            .entry(id)
            .or_default()
            .entry(source)
            .or_insert(0) += count;
    }
}

/// Build the n-grams table from the multitokens of a dictionary.
///
/// Variants under one key are ordered by frequency (descending), then surface.
pub fn ngrams_from_dictionary(dictionary: &super::dictionary::Dictionary) -> NgramsTable {
    let mut table = NgramsTable::new();
    for entry in dictionary.multitokens() {
        let mut parts: Vec<&str> = entry
            .surface
            .split(super::dictionary::MULTITOKEN_SEPARATOR)
            .collect();
        parts.sort_unstable();
        let key = parts.join(super::dictionary::MULTITOKEN_SEPARATOR);

        table.entry(key).or_default().push(NgramVariant {
            surface: entry.surface.clone(),
            frequency: entry.collection_frequency,
        });
    }

    for variants in table.values_mut() {
        variants.sort_by(|a, b| {
            b.frequency
                .cmp(&a.frequency)
                .then_with(|| a.surface.cmp(&b.surface))
        });
    }
    table
}
