use std::cmp::Ordering;

use crate::config::ScoringWeights;
use crate::types::identifiers::SourceIndex;
use crate::types::query_result::ScoreDetails;

pub trait Scorer {
    fn score_value(&self, details: &ScoreDetails) -> f64;
}

/// Weighted sum of the score components.
#[derive(Debug, Clone, Default)]
pub struct WeightedScorer {
    weights: ScoringWeights,
}

impl WeightedScorer {
    pub fn new(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }
}

impl Scorer for WeightedScorer {
    fn score_value(&self, details: &ScoreDetails) -> f64 {
        let category = if details.category_match { 1.0 } else { 0.0 };
        let score = self.weights.term_frequency * details.term
            + self.weights.multitoken_bonus * details.multitoken
            + self.weights.association * details.association
            + self.weights.category * category;
        debug_assert!(score >= 0.0, "score {score} is negative");
        score
    }
}

/// A candidate source with its final score, before result rendering.
#[derive(Debug, Clone)]
pub struct RankedSource<'a> {
    pub source: SourceIndex,
    pub source_id: &'a str,
    pub score: f64,
    pub details: ScoreDetails,
}

/// Keep positive scores, order them and cut to `top_k`.
///
/// Order: score descending, then shorter source id, then ingestion order.
pub fn rank(mut candidates: Vec<RankedSource<'_>>, top_k: usize) -> Vec<RankedSource<'_>> {
    candidates.retain(|c| c.score > 0.0);

    candidates.sort_by(|a, b| {
        let score_cmp = b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal);
        if score_cmp != Ordering::Equal {
            return score_cmp;
        }
        a.source_id
            .len()
            .cmp(&b.source_id.len())
            .then_with(|| a.source.cmp(&b.source))
    });

    debug_assert!(candidates.windows(2).all(|w| {
        let (a, b) = (&w[0], &w[1]);
        a.score > b.score
            || (a.score == b.score
                && (a.source_id.len(), a.source) <= (b.source_id.len(), b.source))
    }));

    candidates.truncate(top_k);
    candidates
}
