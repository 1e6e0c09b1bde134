//! Content-addressable blob storage behind a narrow trait so the pipeline
//! and queries never care where bytes actually live.

mod fs_store;
mod memory;

pub use fs_store::*;
pub use memory::*;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("blob not found: {0}")]
    NotFound(String),

    #[error("invalid blob path: {0}")]
    InvalidPath(String),

    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),
}

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn put(&self, path: &str, bytes: &[u8], content_type: &str) -> Result<(), StorageError>;

    async fn get(&self, path: &str) -> Result<Vec<u8>, StorageError>;

    /// Best-effort bulk delete; missing blobs are not an error.
    async fn delete(&self, paths: &[String]) -> Result<(), StorageError>;

    /// Deterministic public URL for a stored blob.
    fn public_url(&self, path: &str) -> String;
}
