use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::snapshot::KnowledgeBaseSnapshot;
use crate::association::{AssociationKind, AssociationTable};
use crate::knowledge::dictionary::MULTITOKEN_SEPARATOR;
use crate::knowledge::tables::NgramVariant;
use crate::types::identifiers::TokenId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkedTerm {
    pub surface: String,
    pub score: f64,
    pub kind: AssociationKind,
}

/// Everything the knowledge base knows about one dictionary entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenSummary {
    pub id: TokenId,
    pub surface: String,
    pub collection_frequency: u64,
    pub document_frequency: u64,
    /// `(source_id, occurrences)`, most occurrences first.
    pub sources: Vec<(String, u64)>,
    pub categories: Vec<(String, u64)>,
    pub related: Vec<LinkedTerm>,
    pub see_also: Vec<LinkedTerm>,
    /// Adjacent words from the word-hash.
    pub linked_words: Vec<(String, u64)>,
    /// Multitokens sharing this entry's constituent set, if it is one.
    pub variants: Vec<NgramVariant>,
    /// Non-zero embedding components, keyed by anchor surface.
    pub embedding: Vec<(String, f64)>,
}

fn by_count_desc(a: &(String, u64), b: &(String, u64)) -> Ordering {
    b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0))
}

fn by_score_desc(a: &LinkedTerm, b: &LinkedTerm) -> Ordering {
    b.score
        .partial_cmp(&a.score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.surface.cmp(&b.surface))
}

impl KnowledgeBaseSnapshot {
    /// Summary of `id`, each list cut to `max_rows` entries.
    pub fn summarize(&self, id: TokenId, max_rows: usize) -> Option<TokenSummary> {
        let entry = self.dictionary.get(id)?;

        let mut sources: Vec<(String, u64)> = self
            .url_map
            .postings(id)
            .into_iter()
            .flatten()
            .filter_map(|(source, count)| {
                self.url_map
                    .source(*source)
                    .map(|s| (s.source_id.clone(), *count))
            })
            .collect();
        // Stable sort keeps ingestion order among equal counts.
        sources.sort_by(|a, b| b.1.cmp(&a.1));
        sources.truncate(max_rows);

        let mut categories: Vec<(String, u64)> = self
            .hash_category
            .get(&id)
            .into_iter()
            .flatten()
            .map(|(category, count)| (category.clone(), *count))
            .collect();
        categories.sort_by(by_count_desc);
        categories.truncate(max_rows);

        let mut linked_words: Vec<(String, u64)> = self
            .word_hash
            .get(&entry.surface)
            .into_iter()
            .flatten()
            .map(|(word, count)| (word.clone(), *count))
            .collect();
        linked_words.sort_by(by_count_desc);
        linked_words.truncate(max_rows);

        let variants = if entry.is_multitoken() {
            let mut parts: Vec<&str> = entry.surface.split(MULTITOKEN_SEPARATOR).collect();
            parts.sort_unstable();
            let key = parts.join(MULTITOKEN_SEPARATOR);
            self.ngrams.get(&key).cloned().unwrap_or_default()
        } else {
            Vec::new()
        };

        let embedding = self
            .embeddings
            .vectors
            .get(&id)
            .map(|vector| {
                self.embeddings
                    .anchors
                    .iter()
                    .zip(vector)
                    .filter(|(_, value)| **value != 0.0)
                    .filter_map(|(anchor, value)| {
                        self.dictionary.surface(*anchor).map(|s| (s.to_string(), *value))
                    })
                    .collect()
            })
            .unwrap_or_default();

        Some(TokenSummary {
            id,
            surface: entry.surface.clone(),
            collection_frequency: entry.collection_frequency,
            document_frequency: entry.document_frequency,
            sources,
            categories,
            related: self.linked_terms(&self.hash_related, id, max_rows),
            see_also: self.linked_terms(&self.hash_see, id, max_rows),
            linked_words,
            variants,
            embedding,
        })
    }

    fn linked_terms(
        &self,
        table: &AssociationTable,
        id: TokenId,
        max_rows: usize,
    ) -> Vec<LinkedTerm> {
        let mut terms: Vec<LinkedTerm> = table
            .iter()
            .filter_map(|pair| {
                let other = pair.other(id)?;
                Some(LinkedTerm {
                    surface: self.dictionary.surface(other)?.to_string(),
                    score: pair.score,
                    kind: pair.kind,
                })
            })
            .collect();
        terms.sort_by(by_score_desc);
        terms.truncate(max_rows);
        terms
    }
}
