//! Id-substituted variants of the n-grams table and the word-hash.
//!
//! Compression only removes what the dictionary can restore: surface
//! strings become ids, frequencies equal to the dictionary's are dropped,
//! and mirrored word pairs are stored once. `decompress(compress(x)) == x`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::knowledge::dictionary::{Dictionary, MULTITOKEN_SEPARATOR};
use crate::knowledge::tables::{NgramVariant, NgramsTable, WordHash};
use crate::knowledge::KnowledgeBaseSnapshot;
use crate::types::identifiers::TokenId;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CompressError {
    #[error("Surface not in dictionary: {0:?}")]
    UnknownSurface(String),
    #[error("Token id not in dictionary: {0}")]
    UnknownTokenId(TokenId),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressedNgramMember {
    pub id: TokenId,
    /// Present only when it differs from the dictionary frequency.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressedNgramBucket {
    pub key: Vec<TokenId>,
    pub members: Vec<CompressedNgramMember>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressedWordPairs {
    /// `(a, b, count)` with `a < b`, standing for both directions.
    pub symmetric: Vec<(TokenId, TokenId, u64)>,
    /// One-directional leftovers.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub directed: Vec<(TokenId, TokenId, u64)>,
    /// Keys present with no partners.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub isolated: Vec<TokenId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressedTables {
    pub ngrams: Vec<CompressedNgramBucket>,
    pub word_pairs: CompressedWordPairs,
}

fn id_of(dictionary: &Dictionary, surface: &str) -> Result<TokenId, CompressError> {
    dictionary
        .id_of(surface)
        .ok_or_else(|| CompressError::UnknownSurface(surface.to_string()))
}

fn surface_of(dictionary: &Dictionary, id: TokenId) -> Result<&str, CompressError> {
    dictionary
        .surface(id)
        .ok_or(CompressError::UnknownTokenId(id))
}

pub struct Compressor;

impl Compressor {
    pub fn compress(
        dictionary: &Dictionary,
        ngrams: &NgramsTable,
        word_hash: &WordHash,
    ) -> Result<CompressedTables, CompressError> {
        Ok(CompressedTables {
            ngrams: Self::compress_ngrams(dictionary, ngrams)?,
            word_pairs: Self::compress_word_hash(dictionary, word_hash)?,
        })
    }

    pub fn compress_snapshot(
        snapshot: &KnowledgeBaseSnapshot,
    ) -> Result<CompressedTables, CompressError> {
        Self::compress(&snapshot.dictionary, &snapshot.ngrams, &snapshot.word_hash)
    }

    pub fn decompress(
        compressed: &CompressedTables,
        dictionary: &Dictionary,
    ) -> Result<(NgramsTable, WordHash), CompressError> {
        Ok((
            Self::decompress_ngrams(&compressed.ngrams, dictionary)?,
            Self::decompress_word_pairs(&compressed.word_pairs, dictionary)?,
        ))
    }

    pub fn compress_ngrams(
        dictionary: &Dictionary,
        ngrams: &NgramsTable,
    ) -> Result<Vec<CompressedNgramBucket>, CompressError> {
        let mut buckets = Vec::with_capacity(ngrams.len());
        for (key, variants) in ngrams {
            let key_ids = key
                .split(MULTITOKEN_SEPARATOR)
                .map(|part| id_of(dictionary, part))
                .collect::<Result<Vec<_>, _>>()?;

            let mut members = Vec::with_capacity(variants.len());
            for variant in variants {
                let id = id_of(dictionary, &variant.surface)?;
                let known = dictionary.get(id).map(|e| e.collection_frequency);
                members.push(CompressedNgramMember {
                    id,
                    frequency: (known != Some(variant.frequency)).then_some(variant.frequency),
                });
            }

            buckets.push(CompressedNgramBucket {
                key: key_ids,
                members,
            });
        }
        Ok(buckets)
    }

    pub fn decompress_ngrams(
        buckets: &[CompressedNgramBucket],
        dictionary: &Dictionary,
    ) -> Result<NgramsTable, CompressError> {
        let mut table = NgramsTable::new();
        for bucket in buckets {
            let key = bucket
                .key
                .iter()
                .map(|id| surface_of(dictionary, *id))
                .collect::<Result<Vec<_>, _>>()?
                .join(MULTITOKEN_SEPARATOR);

            let mut variants = Vec::with_capacity(bucket.members.len());
            for member in &bucket.members {
                let entry = dictionary
                    .get(member.id)
                    .ok_or(CompressError::UnknownTokenId(member.id))?;
                variants.push(NgramVariant {
                    surface: entry.surface.clone(),
                    frequency: member.frequency.unwrap_or(entry.collection_frequency),
                });
            }
            table.insert(key, variants);
        }
        Ok(table)
    }

    pub fn compress_word_hash(
        dictionary: &Dictionary,
        word_hash: &WordHash,
    ) -> Result<CompressedWordPairs, CompressError> {
        let mut directed: BTreeMap<(TokenId, TokenId), u64> = BTreeMap::new();
        let mut isolated = Vec::new();

        for (x, row) in word_hash {
            let ix = id_of(dictionary, x)?;
            if row.is_empty() {
                isolated.push(ix);
            }
            for (y, count) in row {
                directed.insert((ix, id_of(dictionary, y)?), *count);
            }
        }

        let mut symmetric = Vec::new();
        let mut leftovers = Vec::new();
        for (&(a, b), &count) in &directed {
            if a < b && directed.get(&(b, a)) == Some(&count) {
                symmetric.push((a, b, count));
            } else if a > b && directed.get(&(b, a)) == Some(&count) {
                // Already emitted from the (b, a) side.
            } else {
                leftovers.push((a, b, count));
            }
        }
        isolated.sort_unstable();

        Ok(CompressedWordPairs {
            symmetric,
            directed: leftovers,
            isolated,
        })
    }

    pub fn decompress_word_pairs(
        pairs: &CompressedWordPairs,
        dictionary: &Dictionary,
    ) -> Result<WordHash, CompressError> {
        let mut word_hash = WordHash::new();

        for id in &pairs.isolated {
            word_hash.entry(surface_of(dictionary, *id)?.to_string()).or_default();
        }
        for &(a, b, count) in &pairs.symmetric {
            let sa = surface_of(dictionary, a)?.to_string();
            let sb = surface_of(dictionary, b)?.to_string();
            word_hash.entry(sa.clone()).or_default().insert(sb.clone(), count);
            word_hash.entry(sb).or_default().insert(sa, count);
        }
        for &(a, b, count) in &pairs.directed {
            let sa = surface_of(dictionary, a)?.to_string();
            let sb = surface_of(dictionary, b)?.to_string();
            word_hash.entry(sa).or_default().insert(sb, count);
        }

        Ok(word_hash)
    }
}
