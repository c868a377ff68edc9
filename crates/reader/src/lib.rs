//! Chapter loading for plain-text documents.
//!
//! A [`Reader`] owns the active document. [`Reader::ingest`] decodes a
//! source, indexes its chapters and caches the result; [`Reader::load_chapter`]
//! then serves any chapter, in order of preference:
//! 1. from the content cache, sliced out of the stored text,
//! 2. from the source itself, re-read and decoded one chapter at a time,
//! 3. not at all: [`ErrorKind::MissingSource`](error::ErrorKind::MissingSource)
//!    asks for the original document to be opened again.
//!
//! The reading position is kept in a separate state store so it survives a
//! lost content cache, and is picked up again by [`Reader::restore`].
//!
//! ```no_run
//! # async fn example() -> quire_reader::error::Result<()> {
//! use quire_config::Config;
//! use quire_reader::Reader;
//! use quire_storage::SourceRef;
//!
//! let config = Config::load(None).expect("configuration");
//! let mut reader = Reader::open(&config).await?;
//! if !reader.restore().await? {
//!     reader.ingest(SourceRef::local("novel.txt").expect("source")).await?;
//! }
//! while let Some(chapter) = reader.next_chapter().await? {
//!     println!("{chapter}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod error;
mod reader;
mod slice;
mod view;

pub use crate::reader::{Reader, ReaderOptions};
pub use crate::view::{Phase, ReaderView};
