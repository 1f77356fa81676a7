pub mod jsonl;
pub mod record;

pub use jsonl::JsonLinesSource;
pub use record::{DocumentRecord, IngestError};

/// Anything that can hand the builder a stream of document records.
///
/// Per-record failures travel inside the stream; the builder decides
/// whether to skip them.
pub trait Ingestible {
    type Records: Iterator<Item = Result<DocumentRecord, IngestError>>;

    fn records(self) -> Self::Records;
}

impl Ingestible for Vec<DocumentRecord> {
    type Records = std::iter::Map<
        std::vec::IntoIter<DocumentRecord>,
        fn(DocumentRecord) -> Result<DocumentRecord, IngestError>,
    >;

    fn records(self) -> Self::Records {
        self.into_iter()
            .map(Ok as fn(DocumentRecord) -> Result<DocumentRecord, IngestError>)
    }
}

impl Ingestible for Vec<Result<DocumentRecord, IngestError>> {
    type Records = std::vec::IntoIter<Result<DocumentRecord, IngestError>>;

    fn records(self) -> Self::Records {
        self.into_iter()
    }
}
