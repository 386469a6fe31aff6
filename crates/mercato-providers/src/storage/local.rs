use std::path::{Path, PathBuf};

use async_trait::async_trait;
use mercato_core::{ObjectStoragePort, ProviderError, StoredObject};
use tracing::debug;

use super::check_key;
use crate::error::ProviderHttpError;

/// Stores objects as files below a root directory.
///
/// URLs are relative (`{public_path}/{key}`); the API server mounts the
/// root directory at `public_path`.
pub struct LocalStorage {
    root: PathBuf,
    public_path: String,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>, public_path: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_path: public_path.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, ProviderError> {
        check_key(key)?;
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl ObjectStoragePort for LocalStorage {
    fn provider(&self) -> &str {
        "local"
    }

    async fn put(
        &self,
        key: &str,
        bytes: &[u8],
        _content_type: &str,
    ) -> Result<StoredObject, ProviderError> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(ProviderHttpError::from)?;
        }
        tokio::fs::write(&path, bytes)
            .await
            .map_err(ProviderHttpError::from)?;
        debug!(path = %path.display(), size = bytes.len(), "Stored object");

        Ok(StoredObject {
            url: format!("{}/{key}", self.public_path.trim_end_matches('/')),
        })
    }

    async fn delete(&self, key: &str) -> Result<(), ProviderError> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ProviderHttpError::from(e).into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_put_writes_nested_file() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path(), "/media/");

        let stored = storage
            .put("7/1700-abc.png", b"\x89PNG", "image/png")
            .await
            .unwrap();

        assert_eq!(stored.url, "/media/7/1700-abc.png");
        let on_disk = std::fs::read(dir.path().join("7/1700-abc.png")).unwrap();
        assert_eq!(on_disk, b"\x89PNG");
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path(), "/media");
        storage.put("1/a.pdf", b"%PDF", "application/pdf").await.unwrap();

        storage.delete("1/a.pdf").await.unwrap();
        assert!(!dir.path().join("1/a.pdf").exists());
        storage.delete("1/a.pdf").await.unwrap();
    }

    #[tokio::test]
    async fn test_traversal_is_rejected() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path().join("uploads"), "/media");
        let err = storage.put("../escape.png", b"x", "image/png").await.unwrap_err();
        assert!(matches!(err, ProviderError::Rejected { status: 400, .. }));
        assert!(!dir.path().join("escape.png").exists());
    }
}
