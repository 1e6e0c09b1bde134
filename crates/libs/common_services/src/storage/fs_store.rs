use crate::storage::{ObjectStorage, StorageError};
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Stores blobs under a root folder; public URLs are served from the same
/// tree by the API's static file route.
pub struct FsStorage {
    root: PathBuf,
    public_base_url: String,
}

impl FsStorage {
    #[must_use]
    pub fn new(root: PathBuf, public_base_url: &str) -> Self {
        Self {
            root,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Resolves a blob path under the root, rejecting traversal components.
    fn resolve(&self, path: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(path);
        let safe = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if path.is_empty() || !safe {
            return Err(StorageError::InvalidPath(path.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ObjectStorage for FsStorage {
    async fn put(&self, path: &str, bytes: &[u8], _content_type: &str) -> Result<(), StorageError> {
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&target, bytes).await?;
        Ok(())
    }

    async fn get(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        let target = self.resolve(path)?;
        match fs::read(&target).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(path.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, paths: &[String]) -> Result<(), StorageError> {
        for path in paths {
            let target = self.resolve(path)?;
            match fs::remove_file(&target).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    debug!("Blob already gone: {}", path);
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        format!("{}/{}", self.public_base_url, path.trim_start_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_get_delete_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FsStorage::new(dir.path().to_path_buf(), "http://localhost:8468/media/");

        storage
            .put("albums/a1/photos/0001.jpg", b"bytes", "image/jpeg")
            .await
            .unwrap();
        let bytes = storage.get("albums/a1/photos/0001.jpg").await.unwrap();
        assert_eq!(bytes, b"bytes");

        storage
            .delete(&["albums/a1/photos/0001.jpg".to_string()])
            .await
            .unwrap();
        assert!(matches!(
            storage.get("albums/a1/photos/0001.jpg").await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn rejects_traversal_paths() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FsStorage::new(dir.path().to_path_buf(), "http://localhost:8468/media");
        assert!(matches!(
            storage.get("../outside").await,
            Err(StorageError::InvalidPath(_))
        ));
    }

    #[test]
    fn public_url_joins_base_and_path() {
        let storage = FsStorage::new(PathBuf::from("/tmp/blobs"), "http://host/media/");
        assert_eq!(
            storage.public_url("albums/a1/photos/0001.jpg"),
            "http://host/media/albums/a1/photos/0001.jpg"
        );
    }

    #[tokio::test]
    async fn deleting_missing_blobs_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FsStorage::new(dir.path().to_path_buf(), "http://host/media");
        storage.delete(&["nope.jpg".to_string()]).await.unwrap();
    }
}
