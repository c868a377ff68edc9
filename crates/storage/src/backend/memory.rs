//! In-memory source backend.

use crate::error::{ErrorKind, Result};
use crate::models::FileInfo;
use crate::path::validate as validate_path;
use crate::SourceBackend;
use async_trait::async_trait;
use std::collections::HashMap;
use std::ops::Range;
use std::path::{Path, PathBuf};
use time::UtcDateTime;
use tokio::sync::RwLock;

/// Holds source documents that were handed over as bytes (drag and drop, a
/// file picker) together with their modification time.
///
/// Files are stored in a `HashMap` behind a [`RwLock`], so all trait methods
/// operate on `&self`.
///
/// ```
/// use quire_storage::backend::{MemoryBackend, SourceBackend};
/// use std::path::Path;
/// use time::UtcDateTime;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = MemoryBackend::default().with_file("novel.txt", "第一章", UtcDateTime::now())?;
/// assert!(backend.exists(Path::new("novel.txt")).await?);
/// # Ok(())
/// # }
/// ```
pub struct MemoryBackend {
    name: String,
    storage: RwLock<HashMap<PathBuf, (UtcDateTime, Vec<u8>)>>,
}
impl MemoryBackend {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Add a file while building the backend.
    pub fn with_file(
        mut self,
        path: impl AsRef<Path>,
        data: impl Into<Vec<u8>>,
        modified: UtcDateTime,
    ) -> Result<Self> {
        let path = validate_path(path)?;
        self.storage.get_mut().insert(path, (modified, data.into()));
        Ok(self)
    }

    /// Add or replace a file, returning its normalized path.
    pub async fn insert(&self, path: impl AsRef<Path>, data: impl Into<Vec<u8>>, modified: UtcDateTime) -> Result<PathBuf> {
        let path = validate_path(path)?;
        self.storage.write().await.insert(path.clone(), (modified, data.into()));
        Ok(path)
    }

    /// Forget a file, as if its source went away.
    pub async fn remove(&self, path: &Path) -> Result<()> {
        let path = validate_path(path)?;
        self.storage.write().await.remove(&path).map(|_| ()).ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(path)))
    }
}
impl Default for MemoryBackend {
    fn default() -> Self {
        Self {
            name: "memory".to_string(),
            storage: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl SourceBackend for MemoryBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        let path = validate_path(path)?;
        Ok(self.storage.read().await.contains_key(&path))
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        self.read_range(path, 0..u64::MAX).await
    }

    async fn read_head(&self, path: &Path, bytes: usize) -> Result<Vec<u8>> {
        self.read_range(path, 0..bytes as u64).await
    }

    async fn read_range(&self, path: &Path, range: Range<u64>) -> Result<Vec<u8>> {
        let path = validate_path(path)?;
        let guard = self.storage.read().await;
        let (_modified, data) = guard.get(&path).ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(path.clone())))?;
        let len = data.len() as u64;
        let end = range.end.min(len);
        let start = range.start.min(end);
        Ok(data[start as usize..end as usize].to_vec())
    }

    async fn stat(&self, path: &Path) -> Result<FileInfo> {
        let path = validate_path(path)?;
        let guard = self.storage.read().await;
        let (modified, data) = guard.get(&path).ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(path.clone())))?;
        Ok(FileInfo::new(path.clone(), data.len() as u64, *modified))
    }
}
