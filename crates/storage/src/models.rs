use std::fmt;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use exn::ResultExt;
use time::UtcDateTime;
use tracing::instrument;

use crate::BackendHandle;
use crate::backend::{LocalBackend, MemoryBackend};
use crate::error::{ErrorKind, Result};
use crate::path::validate as validate_path;

/// Source metadata returned by backends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    /// Path relative to the backend root
    pub path: PathBuf,
    /// Size in bytes
    pub size: u64,
    /// Last modified timestamp
    pub modified: UtcDateTime,
}
impl FileInfo {
    pub fn new(path: impl Into<PathBuf>, size: u64, modified: UtcDateTime) -> Self {
        Self { path: path.into(), size, modified }
    }

    /// The file name, as shown to (and picked by) the user.
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.to_string_lossy().into_owned())
    }

    pub fn identity(&self) -> FileIdentity {
        FileIdentity::new(&self.name(), self.size, self.modified)
    }
}

/// Deterministic fingerprint of a source document.
///
/// BLAKE3 over `"{name}_{size}_{modified_unix_ms}"`, hex encoded. The same
/// named, sized and timestamped file always maps to the same identity, so a
/// file opened twice hits the same cache record. Content is never hashed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileIdentity(String);
impl FileIdentity {
    pub fn new(name: &str, size: u64, modified: UtcDateTime) -> Self {
        let millis = modified.unix_timestamp_nanos() / 1_000_000;
        let fingerprint = format!("{name}_{size}_{millis}");
        Self(blake3::hash(fingerprint.as_bytes()).to_hex().to_string())
    }

    /// Rebuild an identity previously rendered with [`as_str`](Self::as_str).
    pub fn parse(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        if value.len() != blake3::OUT_LEN * 2 || !value.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
            exn::bail!(ErrorKind::InvalidIdentity(value));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
impl fmt::Display for FileIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A handle to re-read a source document's bytes later.
#[derive(Clone)]
pub struct SourceRef {
    backend: BackendHandle,
    path: PathBuf,
}
impl SourceRef {
    pub fn new(backend: BackendHandle, path: impl Into<PathBuf>) -> Self {
        Self { backend, path: path.into() }
    }

    /// Reference a file on the local filesystem.
    ///
    /// The file's parent directory becomes the backend root.
    pub fn local(path: impl AsRef<Path>) -> Result<Self> {
        let absolute = std::path::absolute(path.as_ref()).or_raise(|| ErrorKind::InvalidPath(path.as_ref().to_path_buf()))?;
        let (Some(root), Some(name)) = (absolute.parent(), absolute.file_name()) else {
            exn::bail!(ErrorKind::InvalidPath(absolute.clone()));
        };
        let backend = LocalBackend::new("local", root)?;
        Ok(Self::new(Arc::new(backend), name))
    }

    /// Reference bytes handed over in memory (drag and drop, a file picker).
    pub fn memory(name: impl Into<PathBuf>, data: impl Into<Vec<u8>>, modified: UtcDateTime) -> Result<Self> {
        let path = validate_path(name.into())?;
        let backend = MemoryBackend::default().with_name("memory").with_file(&path, data, modified)?;
        Ok(Self::new(Arc::new(backend), path))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    pub async fn stat(&self) -> Result<FileInfo> {
        self.backend.stat(&self.path).await
    }

    pub async fn identity(&self) -> Result<FileIdentity> {
        Ok(self.stat().await?.identity())
    }

    #[instrument(skip(self), fields(backend = self.backend.name(), path = %self.path.display()))]
    pub async fn read(&self) -> Result<Vec<u8>> {
        self.backend.read(&self.path).await
    }

    pub async fn read_head(&self, bytes: usize) -> Result<Vec<u8>> {
        self.backend.read_head(&self.path, bytes).await
    }

    pub async fn read_range(&self, range: Range<u64>) -> Result<Vec<u8>> {
        self.backend.read_range(&self.path, range).await
    }
}
impl fmt::Debug for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceRef")
            .field("backend", &self.backend.name())
            .field("path", &self.path)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(millis: i64) -> UtcDateTime {
        UtcDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000).unwrap()
    }

    #[test]
    fn test_identity_is_deterministic() {
        let modified = at(1_709_294_400_250);
        let a = FileInfo::new("shelf/novel.txt", 1024, modified);
        let b = FileInfo::new("elsewhere/novel.txt", 1024, modified);
        // Only the file name takes part, not the directory.
        assert_eq!(a.identity(), b.identity());
        assert_eq!(a.identity().as_str().len(), 64);
    }

    #[test]
    fn test_identity_changes_with_any_component() {
        let modified = at(1_709_294_400_000);
        let base = FileIdentity::new("novel.txt", 1024, modified);
        assert_ne!(base, FileIdentity::new("novel2.txt", 1024, modified));
        assert_ne!(base, FileIdentity::new("novel.txt", 1025, modified));
        assert_ne!(base, FileIdentity::new("novel.txt", 1024, at(1_709_294_400_001)));
    }

    #[test]
    fn test_identity_parse() {
        let identity = FileIdentity::new("novel.txt", 1, UtcDateTime::UNIX_EPOCH);
        assert_eq!(FileIdentity::parse(identity.to_string()).unwrap(), identity);
        assert!(FileIdentity::parse("not-a-digest").is_err());
        assert!(FileIdentity::parse(identity.as_str().to_uppercase()).is_err());
    }

    #[tokio::test]
    async fn test_memory_source_ref() {
        let modified = at(1_709_294_400_000);
        let source = SourceRef::memory("novel.txt", b"0123456789".to_vec(), modified).unwrap();
        let info = source.stat().await.unwrap();
        assert_eq!(info.size, 10);
        assert_eq!(info.name(), "novel.txt");
        assert_eq!(source.identity().await.unwrap(), FileIdentity::new("novel.txt", 10, modified));
        assert_eq!(source.read_head(3).await.unwrap(), b"012");
        assert_eq!(source.read_range(3..6).await.unwrap(), b"345");
    }

    #[tokio::test]
    async fn test_local_source_ref() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file = temp_dir.path().join("novel.txt");
        std::fs::write(&file, "第一章").unwrap();
        let source = SourceRef::local(&file).unwrap();
        assert_eq!(source.path(), Path::new("novel.txt"));
        assert_eq!(source.read().await.unwrap(), "第一章".as_bytes());
        assert_eq!(source.stat().await.unwrap().size, 9);
    }
}
