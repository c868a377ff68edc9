//! Byte sources that a document can be (re-)read from.
//!
//! A reader never keeps a whole source file in memory: it holds a
//! [`SourceRef`] (a backend plus a path) and reads the head, a byte range, or
//! the entire file on demand. Sources are identified by a [`FileIdentity`]
//! derived from their name, size and modification time.

pub mod backend;
pub mod error;
mod models;
mod path;

pub use crate::backend::SourceBackend;
pub use crate::models::{FileIdentity, FileInfo, SourceRef};
pub use crate::path::validate as validate_path;
use std::sync::Arc;

pub type BackendHandle = Arc<dyn SourceBackend + Send + Sync>;
