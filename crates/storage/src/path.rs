//! Source path validation.

use std::path::{Component, Path, PathBuf};

use crate::error::{ErrorKind, Result};

/// Normalize a source path relative to a backend root.
///
/// `.` components and repeated separators are dropped and `..` is resolved
/// in place. A path that would climb above the root, contains a null byte,
/// carries a Windows prefix, or normalizes to nothing is rejected with
/// [`InvalidPath`](crate::error::ErrorKind::InvalidPath).
///
/// ```
/// use std::path::Path;
/// use quire_storage::validate_path;
/// assert_eq!(validate_path("books/./novel.txt").unwrap(), Path::new("books/novel.txt"));
/// assert_eq!(validate_path("books/../novel.txt").unwrap(), Path::new("novel.txt"));
/// assert!(validate_path("../novel.txt").is_err());
/// assert!(validate_path("nov\0el.txt").is_err());
/// ```
pub fn validate(path: impl AsRef<Path>) -> Result<PathBuf> {
    let original = path.as_ref();
    let invalid = || exn::Exn::from(ErrorKind::InvalidPath(original.to_path_buf()));
    let mut components = Vec::new();
    for component in original.components() {
        match component {
            // Null bytes survive Path::components() on Unix but truncate in syscalls.
            Component::Normal(part) if part.as_encoded_bytes().contains(&0) => return Err(invalid()),
            Component::Normal(part) => components.push(part),
            Component::CurDir | Component::RootDir => {},
            Component::Prefix(_) => return Err(invalid()),
            Component::ParentDir => {
                components.pop().ok_or_else(invalid)?;
            },
        }
    }
    if components.is_empty() {
        return Err(invalid());
    }
    Ok(components.into_iter().collect())
}
