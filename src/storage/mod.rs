//! Audio blob storage
//!
//! Uploaded recordings live outside the database. A blob is addressed by an opaque
//! key of the form `voices/<uuid>.<ext>`; the record only holds that key.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Mutex;
use uuid::Uuid;

const BLOB_PREFIX: &str = "voices";
const FALLBACK_EXTENSION: &str = "bin";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("blob storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("blob {0} not found")]
    NotFound(String),

    #[error("invalid blob key: {0}")]
    InvalidKey(String),
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Opaque blob storage for uploaded audio
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `bytes` under a fresh key derived from `filename` and return the key
    async fn put(&self, filename: &str, bytes: &[u8]) -> StorageResult<String>;

    async fn get(&self, key: &str) -> StorageResult<Vec<u8>>;

    /// Remove a blob. Removing a missing blob is not an error.
    async fn delete(&self, key: &str) -> StorageResult<()>;
}

/// Fresh key for an upload, keeping the original extension when it looks sane
pub fn blob_key_for(filename: &str) -> String {
    let extension = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty() && e.len() <= 8 && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_else(|| FALLBACK_EXTENSION.to_string());

    format!("{}/{}.{}", BLOB_PREFIX, Uuid::new_v4(), extension)
}

/// Blobs as files under a root directory
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a key to a path, rejecting anything that could escape the root
    fn resolve(&self, key: &str) -> StorageResult<PathBuf> {
        let relative = Path::new(key);
        let safe = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !safe {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn put(&self, filename: &str, bytes: &[u8]) -> StorageResult<String> {
        let key = blob_key_for(filename);
        let path = self.resolve(&key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;
        tracing::debug!("Stored blob {} ({} bytes)", key, bytes.len());
        Ok(key)
    }

    async fn get(&self, key: &str) -> StorageResult<Vec<u8>> {
        let path = self.resolve(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        let path = self.resolve(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                tracing::debug!("Removed blob {}", key);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-process blob store, used by tests and ephemeral deployments
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blobs.lock().map(|b| b.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, key: &str) -> bool {
        self.blobs
            .lock()
            .map(|b| b.contains_key(key))
            .unwrap_or(false)
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, filename: &str, bytes: &[u8]) -> StorageResult<String> {
        let key = blob_key_for(filename);
        let mut blobs = self
            .blobs
            .lock()
            .map_err(|_| StorageError::Io(std::io::Error::other("blob map poisoned")))?;
        blobs.insert(key.clone(), bytes.to_vec());
        Ok(key)
    }

    async fn get(&self, key: &str) -> StorageResult<Vec<u8>> {
        let blobs = self
            .blobs
            .lock()
            .map_err(|_| StorageError::Io(std::io::Error::other("blob map poisoned")))?;
        blobs
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        let mut blobs = self
            .blobs
            .lock()
            .map_err(|_| StorageError::Io(std::io::Error::other("blob map poisoned")))?;
        blobs.remove(key);
        Ok(())
    }
}
