//! Source backend trait and implementations.
//!
//! A [`SourceBackend`] is anything a document's bytes can be re-read from:
//! the local filesystem, or a buffer handed over in memory.

mod local;
mod memory;

pub use self::local::LocalBackend;
pub use self::memory::MemoryBackend;
use crate::error::Result;
use crate::models::FileInfo;
use async_trait::async_trait;
use std::ops::Range;
use std::path::Path;

/// Read-only access to source documents.
///
/// # Path Handling
/// All paths are relative to the backend root and are validated using
/// [`validate_path`](crate::validate_path) before use. Implementations
/// enforce this validation.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use quire_storage::{backend::SourceBackend, error::Result};
///
/// async fn sniff(backend: &dyn SourceBackend) -> Result<bool> {
///     let path = Path::new("novel.txt");
///     if !backend.exists(path).await? {
///         return Ok(false);
///     }
///     let head = backend.read_head(path, 3).await?;
///     Ok(head == [0xEF, 0xBB, 0xBF])
/// }
/// ```
#[async_trait]
pub trait SourceBackend: Send + Sync {
    /// Name of the backend (for logging only).
    fn name(&self) -> &str;

    /// Check if a file exists.
    async fn exists(&self, path: &Path) -> Result<bool>;

    /// Read the complete file contents.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the file
    /// does not exist.
    async fn read(&self, path: &Path) -> Result<Vec<u8>>;

    /// Read only the first N bytes.
    ///
    /// If the file is smaller than `bytes`, returns the entire file.
    async fn read_head(&self, path: &Path, bytes: usize) -> Result<Vec<u8>>;

    /// Read the bytes in `range`.
    ///
    /// The range is clamped to the file: a range past the end returns fewer
    /// bytes (possibly none) rather than an error.
    async fn read_range(&self, path: &Path, range: Range<u64>) -> Result<Vec<u8>>;

    /// Get file metadata without reading contents.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the file
    /// does not exist.
    async fn stat(&self, path: &Path) -> Result<FileInfo>;
}
