use super::spelling;
use super::{Normalizer, NormalizerConfig, Vocabulary};

/// Default normalizer: lowercase, fold, split, filter stop words, then
/// apply vocabulary-guided spelling correction and singularization.
#[derive(Debug, Clone, Default)]
pub struct StandardNormalizer {
    config: NormalizerConfig,
}

impl StandardNormalizer {
    pub fn new(config: NormalizerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &NormalizerConfig {
        &self.config
    }

    fn fold(&self, text: &str) -> String {
        let lower = text.to_lowercase();
        if self.config.char_map.is_empty() {
            return lower;
        }

        let mut out = String::with_capacity(lower.len());
        let mut buf = [0u8; 4];
        for c in lower.chars() {
            match self.config.char_map.get(&*c.encode_utf8(&mut buf)) {
                Some(replacement) => out.push_str(replacement),
                None => out.push(c),
            }
        }
        out
    }

    fn is_stop_word(&self, token: &str) -> bool {
        self.config.stop_words.contains(token)
    }

    /// Known words keep their form, so a plural the vocabulary already
    /// holds is never rewritten to its stem.
    fn singular(&self, token: String, vocabulary: &dyn Vocabulary) -> String {
        if !self.config.singularize || token.chars().count() <= 3 {
            return token;
        }
        if vocabulary.frequency(&token) >= self.config.protect_frequency.max(1) {
            return token;
        }
        match token.strip_suffix('s') {
            Some(stem) if !stem.ends_with('s') && vocabulary.contains(stem) => stem.to_string(),
            _ => token,
        }
    }
}

impl Normalizer for StandardNormalizer {
    fn normalize(&self, text: &str, vocabulary: &dyn Vocabulary) -> Vec<String> {
        let folded = self.fold(text);

        folded
            .split(|c: char| !c.is_alphanumeric())
            .filter(|raw| raw.chars().count() >= self.config.min_token_chars.max(1))
            .filter(|raw| !self.is_stop_word(raw))
            .map(|raw| {
                let token = spelling::correct(raw, vocabulary, &self.config)
                    .unwrap_or_else(|| raw.to_string());
                self.singular(token, vocabulary)
            })
            .filter(|token| !self.is_stop_word(token))
            .collect()
    }

    fn describe(&self) -> String {
        // Every collection in the config is ordered, so the rendering is stable.
        format!("standard:{:?}", self.config)
    }
}
