use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::association::{AssociationConfig, EmbeddingConfig};
use crate::multitoken::MultitokenConfig;
use crate::normalize::{Normalizer, NormalizerConfig};
use crate::types::identifiers::Fingerprint;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid multitoken length: {0} (must be 2 or 3)")]
    InvalidMultitokenLength(usize),
    #[error("Invalid co-occurrence window: {0} (must be at least 1)")]
    InvalidWindow(usize),
    #[error("Invalid embedding dimensions: {0} (must be at least 1)")]
    InvalidDimensions(usize),
    #[error("Invalid threshold {name}: {value}")]
    InvalidThreshold { name: &'static str, value: f64 },
    #[error("Invalid scoring weight {name}: {value} (must be finite and non-negative)")]
    InvalidWeight { name: &'static str, value: f64 },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

/// Everything that decides how text becomes dictionary units. Build and
/// query must agree on it exactly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenizerConfig {
    pub normalizer: NormalizerConfig,
    pub multitoken: MultitokenConfig,
}

// Serializable, comparable, explicit defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    pub version: String,
    pub tokenizer: TokenizerConfig,
    pub association: AssociationConfig,
    pub embedding: EmbeddingConfig,
    /// Characters of source text kept as the result snippet.
    pub snippet_chars: usize,
}

impl BuildConfig {
    pub fn v0() -> Self {
        Self {
            version: "1".into(),
            tokenizer: TokenizerConfig::default(),
            association: AssociationConfig::default(),
            embedding: EmbeddingConfig::default(),
            snippet_chars: 200,
        }
    }

    /// Parse a TOML settings document. Missing sections take their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: BuildConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let max_len = self.tokenizer.multitoken.max_len;
        if !(2..=3).contains(&max_len) {
            return Err(ConfigError::InvalidMultitokenLength(max_len));
        }

        let threshold = self.tokenizer.multitoken.association_threshold;
        if !threshold.is_finite() {
            return Err(ConfigError::InvalidThreshold {
                name: "association_threshold",
                value: threshold,
            });
        }

        if self.association.window == 0 {
            return Err(ConfigError::InvalidWindow(self.association.window));
        }

        if !self.association.related_threshold.is_finite() {
            return Err(ConfigError::InvalidThreshold {
                name: "related_threshold",
                value: self.association.related_threshold,
            });
        }

        if self.embedding.dimensions == 0 {
            return Err(ConfigError::InvalidDimensions(self.embedding.dimensions));
        }

        Ok(())
    }
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self::v0()
    }
}

/// Weights applied to the raw score components of a candidate source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub term_frequency: f64,
    pub multitoken_bonus: f64,
    pub association: f64,
    pub category: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            term_frequency: 1.0,
            multitoken_bonus: 1.5,
            association: 0.25,
            category: 0.5,
        }
    }
}

impl ScoringWeights {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let named = [
            ("term_frequency", self.term_frequency),
            ("multitoken_bonus", self.multitoken_bonus),
            ("association", self.association),
            ("category", self.category),
        ];
        for (name, value) in named {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidWeight { name, value });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    pub weights: ScoringWeights,
}

impl QueryConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: QueryConfig = toml::from_str(content)?;
        config.weights.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }
}

/// Fingerprint of a tokenizer setup: the normalizer's self-description
/// plus the multitoken matching parameters.
pub fn tokenizer_fingerprint(
    normalizer: &dyn Normalizer,
    multitoken: &MultitokenConfig,
) -> Fingerprint {
    let description = normalizer.describe();
    let multitoken = format!("{multitoken:?}");
    Fingerprint::from_parts([
        ("normalizer", description.as_bytes()),
        ("multitoken", multitoken.as_bytes()),
    ])
}
