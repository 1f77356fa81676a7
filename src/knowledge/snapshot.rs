use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::association::{AssociationKind, AssociationTable, Embeddings};
use crate::compress::{CompressedTables, Compressor};
use crate::config::BuildConfig;
use crate::knowledge::dictionary::{Dictionary, MULTITOKEN_SEPARATOR};
use crate::knowledge::tables::{CategoryTable, NgramsTable, UrlMap, WordHash};
use crate::multitoken::MultitokenIndex;
use crate::types::identifiers::{Fingerprint, TokenId};

/// Bumped whenever the persisted table shapes change.
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// A table failed a consistency check.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Inconsistent table {table}: {reason}")]
pub struct IntegrityError {
    pub table: &'static str,
    pub reason: String,
}

fn inconsistent(table: &'static str, reason: impl Into<String>) -> IntegrityError {
    IntegrityError {
        table,
        reason: reason.into(),
    }
}

/// The complete, immutable output of one build.
///
/// Queries read it through `&KnowledgeBaseSnapshot`; a rebuild produces a
/// new value instead of touching this one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeBaseSnapshot {
    pub format_version: u32,
    pub config: BuildConfig,
    /// Tokenizer fingerprint the snapshot was built with.
    pub config_fingerprint: Fingerprint,
    pub dictionary: Dictionary,
    pub embeddings: Embeddings,
    pub word_hash: WordHash,
    pub hash_see: AssociationTable,
    /// `related` and `distant` pairs.
    pub hash_related: AssociationTable,
    pub hash_category: CategoryTable,
    pub ngrams: NgramsTable,
    pub compressed: CompressedTables,
    pub url_map: UrlMap,
}

impl KnowledgeBaseSnapshot {
    pub fn document_count(&self) -> usize {
        self.url_map.sources.len()
    }

    pub fn fingerprint(&self) -> &Fingerprint {
        &self.config_fingerprint
    }

    /// Segmentation index over this snapshot's multitokens.
    pub fn multitoken_index(&self) -> MultitokenIndex {
        MultitokenIndex::build(&self.dictionary, &self.config.tokenizer.multitoken)
    }

    /// Check every cross-table reference and the compressed tables.
    pub fn validate(&self) -> Result<(), IntegrityError> {
        self.validate_dictionary()?;
        self.validate_embeddings()?;
        self.validate_pairs("hash_see", &self.hash_see, &[AssociationKind::SeeAlso])?;
        self.validate_pairs(
            "hash_related",
            &self.hash_related,
            &[AssociationKind::Related, AssociationKind::Distant],
        )?;
        self.validate_categories()?;
        self.validate_url_map()?;
        self.validate_surfaces()?;
        self.validate_compressed()
    }

    fn check_id(&self, table: &'static str, id: TokenId) -> Result<(), IntegrityError> {
        if self.dictionary.contains_id(id) {
            Ok(())
        } else {
            Err(inconsistent(table, format!("dangling token id {id}")))
        }
    }

    fn validate_dictionary(&self) -> Result<(), IntegrityError> {
        const TABLE: &str = "dictionary";

        for (position, entry) in self.dictionary.iter().enumerate() {
            if entry.id.index() != position {
                return Err(inconsistent(
                    TABLE,
                    format!("entry {:?} has id {} at position {position}", entry.surface, entry.id),
                ));
            }
            if entry.surface.is_empty() {
                return Err(inconsistent(TABLE, format!("empty surface for id {}", entry.id)));
            }
            if self.dictionary.id_of(&entry.surface) != Some(entry.id) {
                return Err(inconsistent(TABLE, format!("duplicate surface {:?}", entry.surface)));
            }

            if !entry.is_multitoken() {
                if entry.surface.contains(MULTITOKEN_SEPARATOR) {
                    return Err(inconsistent(
                        TABLE,
                        format!(
                            "single token {:?} contains the multitoken separator",
                            entry.surface
                        ),
                    ));
                }
                continue;
            }

            for part in &entry.constituents {
                let constituent = self.dictionary.get(*part).ok_or_else(|| {
                    let reason = format!("multitoken {:?} references id {part}", entry.surface);
                    inconsistent(TABLE, reason)
                })?;
                if constituent.is_multitoken() {
                    return Err(inconsistent(
                        TABLE,
                        format!("multitoken {:?} nests another multitoken", entry.surface),
                    ));
                }
            }
            let joined = self.dictionary.join_surface(&entry.constituents);
            if joined.as_deref() != Some(entry.surface.as_str()) {
                return Err(inconsistent(
                    TABLE,
                    format!("multitoken {:?} does not match its constituents", entry.surface),
                ));
            }
        }
        Ok(())
    }

    fn validate_embeddings(&self) -> Result<(), IntegrityError> {
        const TABLE: &str = "embeddings";
        let embeddings = &self.embeddings;

        if embeddings.anchors.len() > embeddings.dimensions {
            return Err(inconsistent(TABLE, "more anchors than dimensions"));
        }
        for anchor in &embeddings.anchors {
            self.check_id(TABLE, *anchor)?;
        }
        for (id, vector) in &embeddings.vectors {
            self.check_id(TABLE, *id)?;
            if vector.len() != embeddings.dimensions {
                return Err(inconsistent(
                    TABLE,
                    format!("vector of id {id} has length {}", vector.len()),
                ));
            }
        }
        Ok(())
    }

    fn validate_pairs(
        &self,
        table: &'static str,
        pairs: &AssociationTable,
        allowed: &[AssociationKind],
    ) -> Result<(), IntegrityError> {
        let mut previous: Option<(TokenId, TokenId, AssociationKind)> = None;
        for pair in pairs.iter() {
            self.check_id(table, pair.a)?;
            self.check_id(table, pair.b)?;
            if pair.a >= pair.b {
                let reason = format!("pair ({}, {}) is not canonical", pair.a, pair.b);
                return Err(inconsistent(table, reason));
            }
            if !allowed.contains(&pair.kind) {
                return Err(inconsistent(table, format!("unexpected pair kind {:?}", pair.kind)));
            }
            let key = (pair.a, pair.b, pair.kind);
            if previous.is_some_and(|p| p >= key) {
                let reason = format!("pair ({}, {}) out of order or duplicated", pair.a, pair.b);
                return Err(inconsistent(table, reason));
            }
            previous = Some(key);
        }
        Ok(())
    }

    fn validate_categories(&self) -> Result<(), IntegrityError> {
        for id in self.hash_category.keys() {
            self.check_id("hash_category", *id)?;
        }
        Ok(())
    }

    fn validate_url_map(&self) -> Result<(), IntegrityError> {
        const TABLE: &str = "url_map";
        let source_count = self.url_map.sources.len();

        let mut seen = HashSet::with_capacity(source_count);
        for source in &self.url_map.sources {
            if !seen.insert(source.source_id.as_str()) {
                return Err(inconsistent(TABLE, format!("duplicate source {:?}", source.source_id)));
            }
        }

        for (id, postings) in &self.url_map.postings {
            self.check_id(TABLE, *id)?;
            if let Some(source) = postings.keys().find(|s| s.index() >= source_count) {
                return Err(inconsistent(
                    TABLE,
                    format!("id {id} posts to missing source {}", source.index()),
                ));
            }
        }
        Ok(())
    }

    fn validate_surfaces(&self) -> Result<(), IntegrityError> {
        for (key, variants) in &self.ngrams {
            for variant in variants {
                let entry = self
                    .dictionary
                    .id_of(&variant.surface)
                    .and_then(|id| self.dictionary.get(id))
                    .filter(|e| e.is_multitoken())
                    .ok_or_else(|| {
                        inconsistent("ngrams", format!("unknown multitoken {:?}", variant.surface))
                    })?;

                let mut parts: Vec<&str> = entry.surface.split(MULTITOKEN_SEPARATOR).collect();
                parts.sort_unstable();
                if parts.join(MULTITOKEN_SEPARATOR) != *key {
                    return Err(inconsistent(
                        "ngrams",
                        format!("{:?} filed under key {key:?}", variant.surface),
                    ));
                }
            }
        }

        for (word, row) in &self.word_hash {
            for surface in std::iter::once(word).chain(row.keys()) {
                if self.dictionary.id_of(surface).is_none() {
                    return Err(inconsistent("word_hash", format!("unknown word {surface:?}")));
                }
            }
        }
        Ok(())
    }

    fn validate_compressed(&self) -> Result<(), IntegrityError> {
        let (ngrams, word_hash) = Compressor::decompress(&self.compressed, &self.dictionary)
            .map_err(|e| inconsistent("compressed", e.to_string()))?;

        if ngrams != self.ngrams {
            return Err(inconsistent(
                "compressed_ngrams",
                "does not decompress to the n-grams table",
            ));
        }
        if word_hash != self.word_hash {
            return Err(inconsistent(
                "compressed_word_pairs",
                "does not decompress to the word-hash",
            ));
        }
        Ok(())
    }
}
