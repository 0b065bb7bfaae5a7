//! Filesystem object storage with digest-prefix directory slicing.
//!
//! Objects are laid out under the root as nested two-character hex
//! prefix directories, e.g. with a depth of 3 the object
//! `abcdef…` lives at `root/ab/cd/ef/abcdef…`. Slicing keeps directory
//! fan-out bounded when storing millions of objects.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::{ObjStorage, ObjectId, Result, StorageError};

/// Maximum supported slicing depth (two hex chars per level).
const MAX_DEPTH: usize = 8;

/// A filesystem-backed object storage.
#[derive(Debug)]
pub struct PathSlicingObjStorage {
    /// Root directory of the object tree.
    root: PathBuf,
    /// Number of two-character prefix levels.
    depth: usize,
}

impl PathSlicingObjStorage {
    /// Create a pathslicing storage rooted at `root`.
    ///
    /// The root directory is created if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the depth is out of range or the root cannot
    /// be created.
    pub fn new(root: PathBuf, depth: usize) -> Result<Self> {
        if depth == 0 || depth > MAX_DEPTH {
            return Err(StorageError::backend(format!(
                "slicing depth must be between 1 and {MAX_DEPTH}, got {depth}"
            )));
        }
        std::fs::create_dir_all(&root).map_err(|source| StorageError::Io {
            path: root.clone(),
            source,
        })?;
        Ok(Self { root, depth })
    }

    /// Get the root directory of the object tree.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Compute the on-disk path for an object id.
    fn object_path(&self, id: &ObjectId) -> PathBuf {
        let hexed = id.to_hex();
        let mut path = self.root.clone();
        for level in 0..self.depth {
            path.push(&hexed[level * 2..level * 2 + 2]);
        }
        path.push(&hexed);
        path
    }
}

#[async_trait::async_trait]
impl ObjStorage for PathSlicingObjStorage {
    fn name(&self) -> &'static str {
        "pathslicing"
    }

    async fn get(&self, id: &ObjectId) -> Result<Vec<u8>> {
        let path = self.object_path(id);
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(data),
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound { id: *id })
            }
            Err(source) => Err(StorageError::Io { path, source }),
        }
    }

    async fn add(&self, id: &ObjectId, data: &[u8]) -> Result<()> {
        let path = self.object_path(id);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| StorageError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        // Write through a temp file then rename, so a crashed writer
        // never leaves a truncated object at the final path.
        let tmp = path.with_extension("tmp");
        tokio::fs::write(&tmp, data)
            .await
            .map_err(|source| StorageError::Io {
                path: tmp.clone(),
                source,
            })?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|source| StorageError::Io {
                path: path.clone(),
                source,
            })?;

        debug!("stored {} at {}", id, path.display());
        Ok(())
    }

    async fn contains(&self, id: &ObjectId) -> Result<bool> {
        let path = self.object_path(id);
        match tokio::fs::metadata(&path).await {
            Ok(_) => Ok(true),
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(StorageError::Io { path, source }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_root(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("objreplay_store_{}_{}", tag, std::process::id()))
    }

    #[tokio::test]
    async fn test_add_get_contains() {
        let root = test_root("roundtrip");
        let storage = PathSlicingObjStorage::new(root.clone(), 3).unwrap();
        let id = ObjectId::from_data(b"sliced content");

        assert!(!storage.contains(&id).await.unwrap());
        storage.add(&id, b"sliced content").await.unwrap();
        assert!(storage.contains(&id).await.unwrap());
        assert_eq!(storage.get(&id).await.unwrap(), b"sliced content");

        let _ = std::fs::remove_dir_all(&root);
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let root = test_root("missing");
        let storage = PathSlicingObjStorage::new(root.clone(), 3).unwrap();
        let id = ObjectId::from_data(b"never stored");

        let err = storage.get(&id).await.unwrap_err();
        assert!(err.is_not_found());

        let _ = std::fs::remove_dir_all(&root);
    }

    #[tokio::test]
    async fn test_object_path_layout() {
        let root = test_root("layout");
        let storage = PathSlicingObjStorage::new(root.clone(), 2).unwrap();
        let id = ObjectId::from_data(b"layout");
        let hexed = id.to_hex();

        let path = storage.object_path(&id);
        let expected = root.join(&hexed[0..2]).join(&hexed[2..4]).join(&hexed);
        assert_eq!(path, expected);

        let _ = std::fs::remove_dir_all(&root);
    }

    #[tokio::test]
    async fn test_add_is_idempotent() {
        let root = test_root("idempotent");
        let storage = PathSlicingObjStorage::new(root.clone(), 3).unwrap();
        let id = ObjectId::from_data(b"again");

        storage.add(&id, b"again").await.unwrap();
        storage.add(&id, b"again").await.unwrap();
        assert_eq!(storage.get(&id).await.unwrap(), b"again");

        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn test_rejects_zero_depth() {
        let result = PathSlicingObjStorage::new(test_root("zero"), 0);
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_excessive_depth() {
        let result = PathSlicingObjStorage::new(test_root("deep"), 9);
        assert!(result.is_err());
    }

    #[test]
    fn test_creates_root() {
        let root = test_root("created");
        let _ = std::fs::remove_dir_all(&root);

        let storage = PathSlicingObjStorage::new(root.clone(), 3).unwrap();
        assert!(storage.root().exists());

        let _ = std::fs::remove_dir_all(&root);
    }
}
