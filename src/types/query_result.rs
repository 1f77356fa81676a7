use serde::{Deserialize, Serialize};

use crate::types::identifiers::{Fingerprint, SourceIndex};

/// A free-text query with its result limit.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRequest {
    pub text: String,
    pub top_k: usize,
    /// Overrides the category inferred from the query tokens.
    pub category_hint: Option<String>,
}

impl QueryRequest {
    pub fn new(text: impl Into<String>, top_k: usize) -> Self {
        Self {
            text: text.into(),
            top_k,
            category_hint: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category_hint = Some(category.into());
        self
    }
}

/// A ranked source returned by the query engine.
/// Fully self-contained and serializable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredResult {
    pub source_id: String,
    pub score: f64,

    pub title: Option<String>,
    pub category: String,
    pub snippet: String,

    pub why: ResultWhy,
}

/// Explanation for why a source received its score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultWhy {
    pub matched_terms: Vec<String>,
    pub term_score: f64,
    pub multitoken_score: f64,
    pub association_score: f64,
    pub category_match: bool,
}

/// Internal: raw score components of one source before weighting.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoreDetails {
    pub source: Option<SourceIndex>,
    pub matched_terms: Vec<String>,
    pub term: f64,
    pub multitoken: f64,
    pub association: f64,
    pub category_match: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("Tokenizer mismatch: snapshot built with {expected}, engine uses {found}")]
    ConfigMismatch {
        expected: Fingerprint,
        found: Fingerprint,
    },
}
