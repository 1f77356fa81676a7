//! Text normalization shared by the build and query paths.
//!
//! Build-time and query-time tokenization must agree exactly, so every
//! normalizer exposes a stable `describe()` string that is folded into the
//! snapshot's tokenizer fingerprint.

pub mod spelling;
pub mod standard;

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::hash::BuildHasher;

use serde::{Deserialize, Serialize};

pub use standard::StandardNormalizer;

/// Word frequencies a normalizer may consult for spelling correction and
/// singularization.
pub trait Vocabulary {
    fn frequency(&self, word: &str) -> u64;

    fn contains(&self, word: &str) -> bool {
        self.frequency(word) > 0
    }
}

impl<S: BuildHasher> Vocabulary for HashMap<String, u64, S> {
    fn frequency(&self, word: &str) -> u64 {
        self.get(word).copied().unwrap_or(0)
    }
}

/// A vocabulary that knows no words; disables all vocabulary-driven rewrites.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptyVocabulary;

impl Vocabulary for EmptyVocabulary {
    fn frequency(&self, _word: &str) -> u64 {
        0
    }
}

/// Turns raw text into an ordered sequence of cleaned word tokens.
pub trait Normalizer: Send + Sync {
    fn normalize(&self, text: &str, vocabulary: &dyn Vocabulary) -> Vec<String>;

    /// Stable description of everything that influences `normalize`.
    fn describe(&self) -> String;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    pub stop_words: BTreeSet<String>,
    /// Character folding applied after lowercasing (accents and ligatures).
    pub char_map: BTreeMap<String, String>,
    pub min_token_chars: usize,
    pub spell_correct: bool,
    /// Tokens at least this frequent are never corrected.
    pub protect_frequency: u64,
    /// Minimum frequency of a replacement candidate.
    pub correction_min_frequency: u64,
    pub min_correctable_chars: usize,
    pub singularize: bool,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            stop_words: default_stop_words(),
            char_map: default_char_map(),
            min_token_chars: 2,
            spell_correct: true,
            protect_frequency: 1,
            correction_min_frequency: 2,
            min_correctable_chars: 4,
            singularize: true,
        }
    }
}

impl NormalizerConfig {
    pub fn with_stop_words<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.stop_words = words.into_iter().map(Into::into).collect();
        self
    }
}

fn default_stop_words() -> BTreeSet<String> {
    [
        "in", "the", "and", "to", "of", "a", "this", "for", "is", "with", "from", "as", "on",
        "an", "that", "it", "are", "within", "will", "by", "or", "its", "can", "your", "be",
        "about", "used", "our", "their", "you", "into", "using", "these", "which", "we", "how",
        "see", "below", "all", "use", "across", "provide", "provides", "aims", "one", "ensuring",
        "crucial", "at", "various", "through", "find", "ensure", "more", "another", "but",
        "should", "considered", "provided", "must", "whether", "located", "where", "begins",
        "any",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_char_map() -> BTreeMap<String, String> {
    let folds: [(&str, &str); 11] = [
        ("àáâäãå", "a"),
        ("ç", "c"),
        ("èéêë", "e"),
        ("ìíîï", "i"),
        ("ñ", "n"),
        ("òóôöõø", "o"),
        ("ùúûü", "u"),
        ("ýÿ", "y"),
        ("ß", "ss"),
        ("æ", "ae"),
        ("œ", "oe"),
    ];

    let mut map = BTreeMap::new();
    for (sources, target) in folds {
        for c in sources.chars() {
            map.insert(c.to_string(), target.to_string());
        }
    }
    map
}
