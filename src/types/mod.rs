pub mod identifiers;
pub mod query_result;

pub use identifiers::{Fingerprint, SourceIndex, TokenId};
pub use query_result::{QueryError, QueryRequest, ResultWhy, ScoreDetails, ScoredResult};
