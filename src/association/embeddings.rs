use std::collections::{BTreeMap, HashMap};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::{AssociationKind, AssociationTable};
use crate::knowledge::dictionary::Dictionary;
use crate::types::identifiers::TokenId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Number of anchor tokens, i.e. the vector length.
    pub dimensions: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self { dimensions: 16 }
    }
}

/// Co-occurrence embeddings: each component is the association score of a
/// token against one anchor (the most frequent dictionary entries).
///
/// Only vectors with a non-zero component are stored; every other token
/// has the zero vector.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Embeddings {
    pub dimensions: usize,
    pub anchors: Vec<TokenId>,
    pub vectors: BTreeMap<TokenId, Vec<f64>>,
}

impl Embeddings {
    pub fn build(
        dictionary: &Dictionary,
        associations: &AssociationTable,
        config: &EmbeddingConfig,
    ) -> Self {
        let dimensions = config.dimensions;

        let mut ranked: Vec<(u64, TokenId)> = dictionary
            .iter()
            .filter(|e| e.collection_frequency > 0)
            .map(|e| (e.collection_frequency, e.id))
            .collect();
        ranked.sort_by(|x, y| y.0.cmp(&x.0).then_with(|| x.1.cmp(&y.1)));
        let anchors: Vec<TokenId> = ranked.into_iter().take(dimensions).map(|(_, id)| id).collect();

        let mut scores: HashMap<(TokenId, TokenId), f64> = HashMap::new();
        for pair in associations.iter() {
            if matches!(pair.kind, AssociationKind::Related | AssociationKind::Distant) {
                scores.insert((pair.a, pair.b), pair.score);
            }
        }

        let ids: Vec<TokenId> = dictionary.iter().map(|e| e.id).collect();
        let vectors: BTreeMap<TokenId, Vec<f64>> = ids
            .par_iter()
            .filter_map(|id| {
                let mut vector = vec![0.0; dimensions];
                for (slot, anchor) in vector.iter_mut().zip(&anchors) {
                    if anchor == id {
                        continue;
                    }
                    let key = if id < anchor { (*id, *anchor) } else { (*anchor, *id) };
                    if let Some(score) = scores.get(&key) {
                        *slot = *score;
                    }
                }
                vector.iter().any(|v| *v != 0.0).then_some((*id, vector))
            })
            .collect::<Vec<_>>()
            .into_iter()
            .collect();

        Self {
            dimensions,
            anchors,
            vectors,
        }
    }

    /// Vector of `id`; the zero vector when nothing was stored.
    pub fn vector(&self, id: TokenId) -> Vec<f64> {
        self.vectors
            .get(&id)
            .cloned()
            .unwrap_or_else(|| vec![0.0; self.dimensions])
    }

    /// Cosine similarity of two stored vectors; 0 if either is zero.
    pub fn similarity(&self, x: TokenId, y: TokenId) -> f64 {
        let (Some(u), Some(v)) = (self.vectors.get(&x), self.vectors.get(&y)) else {
            return 0.0;
        };
        let dot: f64 = u.iter().zip(v).map(|(a, b)| a * b).sum();
        let nu: f64 = u.iter().map(|a| a * a).sum::<f64>().sqrt();
        let nv: f64 = v.iter().map(|a| a * a).sum::<f64>().sqrt();
        if nu == 0.0 || nv == 0.0 {
            0.0
        } else {
            dot / (nu * nv)
        }
    }
}
