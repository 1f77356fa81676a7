//! Frequency-guided spelling correction over single-edit candidates.

use std::collections::BTreeSet;

use super::{NormalizerConfig, Vocabulary};

const ALPHABET: &str = "abcdefghijklmnopqrstuvwxyz0123456789";

/// Every string one deletion, transposition, substitution or insertion away
/// from `word`. Sorted and deduplicated.
pub fn edits1(word: &str) -> BTreeSet<String> {
    let chars: Vec<char> = word.chars().collect();
    let n = chars.len();
    let mut out = BTreeSet::new();

    let rebuild = |parts: &[&[char]]| -> String { parts.iter().flat_map(|p| p.iter()).collect() };

    for i in 0..n {
        out.insert(rebuild(&[&chars[..i], &chars[i + 1..]]));
    }
    for i in 0..n.saturating_sub(1) {
        let mut swapped = chars.clone();
        swapped.swap(i, i + 1);
        out.insert(swapped.into_iter().collect());
    }
    for i in 0..n {
        for c in ALPHABET.chars() {
            if c != chars[i] {
                out.insert(rebuild(&[&chars[..i], std::slice::from_ref(&c), &chars[i + 1..]]));
            }
        }
    }
    for i in 0..=n {
        for c in ALPHABET.chars() {
            out.insert(rebuild(&[&chars[..i], std::slice::from_ref(&c), &chars[i..]]));
        }
    }

    out.remove(word);
    out
}

/// Returns the replacement for `word`, if one applies.
///
/// Known words (frequency >= `protect_frequency`) are left alone so that
/// domain vocabulary survives. Among candidates the most frequent wins;
/// equal frequencies resolve to the lexicographically smaller word.
pub fn correct(
    word: &str,
    vocabulary: &dyn Vocabulary,
    config: &NormalizerConfig,
) -> Option<String> {
    if !config.spell_correct || word.chars().count() < config.min_correctable_chars {
        return None;
    }
    if vocabulary.frequency(word) >= config.protect_frequency.max(1) {
        return None;
    }

    let mut best: Option<(u64, String)> = None;
    for candidate in edits1(word) {
        let frequency = vocabulary.frequency(&candidate);
        if frequency < config.correction_min_frequency.max(1) {
            continue;
        }
        // edits1 is sorted, so a strictly greater frequency is required to
        // displace an earlier (lexicographically smaller) candidate.
        match &best {
            Some((best_frequency, _)) if *best_frequency >= frequency => {}
            _ => best = Some((frequency, candidate)),
        }
    }

    best.map(|(_, candidate)| candidate)
}
