//! Multi-token ("multitoken") promotion and greedy longest-match segmentation.

pub mod detection;
pub mod segmentation;

use serde::{Deserialize, Serialize};

pub use detection::{Candidate, MultitokenDetector};
pub use segmentation::{MultitokenIndex, Segment};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MultitokenConfig {
    /// Longest multitoken, in tokens (2 or 3).
    pub max_len: usize,
    /// Joint count an adjacent n-gram must exceed.
    pub frequency_threshold: u64,
    /// Smoothed PMI an adjacent n-gram must exceed.
    pub association_threshold: f64,
    /// Let a window match a multitoken whose constituents are a permutation
    /// of it ("learning machine" -> "machine~learning").
    pub match_permutations: bool,
}

impl Default for MultitokenConfig {
    fn default() -> Self {
        Self {
            max_len: 3,
            frequency_threshold: 1,
            association_threshold: 0.0,
            match_permutations: true,
        }
    }
}
