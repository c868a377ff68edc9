//! Reader Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.
//!
//! Only conditions the caller has to act on are errors. Ambiguous encodings,
//! documents without chapter structure and an unavailable cache are handled
//! inside the reader and only logged.

use derive_more::{Display, Error};

/// A reader error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for reader operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Neither the cache nor a source reference can produce the chapter: the
    /// original document has to be opened again.
    #[display("chapter content unavailable, reload the original document ({_0})")]
    MissingSource(#[error(not(source))] String),
    /// The source document could not be read during ingestion
    #[display("could not read source document")]
    Source,
    /// A source was attached that is not the active document
    #[display("source does not match the active document")]
    SourceMismatch,
    #[display("chapter {index} out of range ({count} chapters)")]
    ChapterOutOfRange { index: usize, count: usize },
    /// No document has been ingested or restored
    #[display("no document is open")]
    NoDocument,
    /// The cache databases could not be opened
    #[display("could not open cache")]
    Cache,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Source | Self::Cache)
    }
}
