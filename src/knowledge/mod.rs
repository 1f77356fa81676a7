//! The compiled knowledge base: dictionary, association and lookup tables,
//! and the builder that produces them.

pub mod builder;
pub mod dictionary;
pub mod index;
pub mod snapshot;
pub mod summary;
pub mod tables;

pub use builder::{BuildError, BuildReport, TableBuilder};
pub use dictionary::{Dictionary, DictionaryEntry, MULTITOKEN_SEPARATOR};
pub use index::SnapshotIndex;
pub use snapshot::{IntegrityError, KnowledgeBaseSnapshot, SNAPSHOT_FORMAT_VERSION};
pub use summary::{LinkedTerm, TokenSummary};
pub use tables::{CategoryTable, NgramVariant, NgramsTable, SourceEntry, UrlMap, WordHash};
