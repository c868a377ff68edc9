//! SQLite persistence for decoded documents and reading state.
//!
//! The cache is advisory: the source document is the ground truth, and
//! everything stored here can be rebuilt by ingesting it again.
//!
//! # Architecture
//! Two stores share one schema but normally live in separate database files:
//! - **Content cache** ([`Repository`]): one [`CacheRecord`] per
//!   [`FileIdentity`](quire_storage::FileIdentity), holding the decoded text,
//!   its table of contents, and the resolved chapter spans. A single chapter
//!   is read straight out of the stored text with `substr()`, without loading
//!   the rest of the document.
//! - **Reading state** ([`StateStore`]): the TOC, current chapter index,
//!   active file identity and source layout, each under its own key, so a
//!   reading position survives even if the content cache is lost.

mod db;
pub mod error;
mod models;
mod repo;
mod state;

pub use crate::db::Database;
pub use crate::models::{CacheRecord, SourceLayout};
pub use crate::repo::Repository;
pub use crate::state::StateStore;
