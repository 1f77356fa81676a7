//! Deterministic knowledge-base compiler and query engine.
//!
//! `xllm-core` turns cleaned text records into a snapshot of hash-indexed
//! tables (dictionary, multitoken n-grams, PMI association tables,
//! co-occurrence embeddings, a URL map and their compressed forms), persists
//! it as a checksummed directory, and ranks sources against free-text
//! queries. Identical records and configuration always produce identical
//! tables, byte for byte.

pub mod association;
pub mod compress;
pub mod config;
pub mod document;
pub mod knowledge;
pub mod multitoken;
pub mod normalize;
pub mod query;
pub mod store;
pub mod types;
