//! Object storage backend for content blobs (local filesystem/memory).

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::path::Path as ObjectPath;
use object_store::{ObjectStore, PutMode};
use serde::{Deserialize, Serialize};

use crate::error::{ContentStoreError, Result};
use crate::hash::is_valid_hash;

/// Configuration for the blob storage backend.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentStoreConfig {
    /// In-memory storage (for testing)
    #[default]
    Memory,

    /// Local filesystem storage
    Local {
        /// Root directory; blobs live at `{path}/{hash}`
        path: PathBuf,
    },
}

/// A stored blob opened for reading.
pub struct Blob {
    /// Size in bytes as reported by the backend
    pub size: u64,
    /// Blob contents
    pub stream: BoxStream<'static, Result<Bytes>>,
}

impl Blob {
    /// Drain the stream into memory.
    pub async fn bytes(self) -> Result<Bytes> {
        let mut buf = BytesMut::with_capacity(self.size as usize);
        let mut stream = self.stream;
        while let Some(chunk) = stream.try_next().await? {
            buf.extend_from_slice(&chunk);
        }
        Ok(buf.freeze())
    }
}

impl fmt::Debug for Blob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Blob").field("size", &self.size).finish()
    }
}

/// Content-addressed blob store.
///
/// Cheap to clone; clones share the backend. All operations are safe to
/// call concurrently.
#[derive(Debug, Clone)]
pub struct ContentStore {
    inner: Arc<dyn ObjectStore>,
}

impl ContentStore {
    /// Create a new store from configuration.
    pub async fn new(config: ContentStoreConfig) -> Result<Self> {
        let inner: Arc<dyn ObjectStore> = match &config {
            ContentStoreConfig::Memory => Arc::new(InMemory::new()),

            ContentStoreConfig::Local { path } => {
                tokio::fs::create_dir_all(path)
                    .await
                    .map_err(|source| ContentStoreError::Path {
                        path: path.clone(),
                        source,
                    })?;
                Arc::new(
                    LocalFileSystem::new_with_prefix(path)
                        .map_err(|e| ContentStoreError::InvalidConfig(e.to_string()))?,
                )
            }
        };

        tracing::debug!(?config, "content store ready");
        Ok(Self { inner })
    }

    /// In-memory store.
    pub fn memory() -> Self {
        Self {
            inner: Arc::new(InMemory::new()),
        }
    }

    /// Build the object path for a blob.
    fn blob_path(hash: &str) -> Result<ObjectPath> {
        if !is_valid_hash(hash) {
            return Err(ContentStoreError::InvalidHash(hash.to_string()));
        }
        Ok(ObjectPath::from(hash))
    }

    /// Write a blob under its hash.
    ///
    /// Idempotent: returns `Ok(false)` without writing when an object for
    /// the hash already exists. The caller vouches that `data` hashes to
    /// `hash`.
    pub async fn put(&self, hash: &str, data: Bytes) -> Result<bool> {
        let path = Self::blob_path(hash)?;
        let size = data.len();

        match self
            .inner
            .put_opts(&path, data.into(), PutMode::Create.into())
            .await
        {
            Ok(_) => {
                tracing::debug!(hash = %hash, size = size, "blob written");
                Ok(true)
            }
            Err(object_store::Error::AlreadyExists { .. }) => {
                tracing::debug!(hash = %hash, "blob already present, skipping write");
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Open a blob for reading.
    pub async fn get(&self, hash: &str) -> Result<Blob> {
        let path = Self::blob_path(hash)?;
        match self.inner.get(&path).await {
            Ok(result) => {
                let size = result.meta.size as u64;
                let stream = result
                    .into_stream()
                    .map_err(ContentStoreError::from)
                    .boxed();
                Ok(Blob { size, stream })
            }
            Err(object_store::Error::NotFound { .. }) => {
                Err(ContentStoreError::NotFound(hash.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Check if a blob exists.
    pub async fn exists(&self, hash: &str) -> Result<bool> {
        let path = Self::blob_path(hash)?;
        match self.inner.head(&path).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete a blob.
    ///
    /// Returns `Ok(false)` when there was nothing to delete.
    pub async fn delete(&self, hash: &str) -> Result<bool> {
        let path = Self::blob_path(hash)?;
        match self.inner.delete(&path).await {
            Ok(()) => {
                tracing::debug!(hash = %hash, "blob deleted");
                Ok(true)
            }
            Err(object_store::Error::NotFound { .. }) => {
                tracing::debug!(hash = %hash, "blob already absent");
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Cheap reachability check for readiness checks.
    pub async fn ping(&self) -> Result<()> {
        let mut listing = self.inner.list(None);
        listing.try_next().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::content_hash;

    #[tokio::test]
    async fn test_memory_storage() {
        let storage = ContentStore::memory();

        let data = Bytes::from("hello world");
        let hash = content_hash(&data);

        assert!(storage.put(&hash, data.clone()).await.unwrap());
        assert!(storage.exists(&hash).await.unwrap());

        let blob = storage.get(&hash).await.unwrap();
        assert_eq!(blob.size, data.len() as u64);
        assert_eq!(blob.bytes().await.unwrap(), data);

        assert!(storage.delete(&hash).await.unwrap());
        assert!(!storage.exists(&hash).await.unwrap());
    }

    #[tokio::test]
    async fn test_put_is_idempotent() {
        let storage = ContentStore::memory();
        let data = Bytes::from("same bytes");
        let hash = content_hash(&data);

        assert!(storage.put(&hash, data.clone()).await.unwrap());
        assert!(!storage.put(&hash, data.clone()).await.unwrap());

        let blob = storage.get(&hash).await.unwrap();
        assert_eq!(blob.bytes().await.unwrap(), data);
    }

    #[tokio::test]
    async fn test_missing_blob() {
        let storage = ContentStore::memory();
        let hash = content_hash(b"never stored");

        assert!(matches!(
            storage.get(&hash).await,
            Err(ContentStoreError::NotFound(_))
        ));
        assert!(!storage.delete(&hash).await.unwrap());
    }

    #[tokio::test]
    async fn test_rejects_malformed_hash() {
        let storage = ContentStore::memory();
        let err = storage
            .put("../etc/passwd", Bytes::from("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, ContentStoreError::InvalidHash(_)));
    }

    #[tokio::test]
    async fn test_local_storage() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = ContentStoreConfig::Local {
            path: temp_dir.path().join("blobs"),
        };

        let storage = ContentStore::new(config).await.unwrap();

        let data = Bytes::from("test data");
        let hash = content_hash(&data);

        storage.put(&hash, data.clone()).await.unwrap();
        let blob = storage.get(&hash).await.unwrap();
        assert_eq!(blob.bytes().await.unwrap(), data);

        // One file per hash directly under the root
        let file_path = temp_dir.path().join("blobs").join(&hash);
        assert!(file_path.exists());

        storage.delete(&hash).await.unwrap();
        assert!(!file_path.exists());
        assert!(!storage.delete(&hash).await.unwrap());
    }

    #[tokio::test]
    async fn test_unusable_local_root() {
        let temp_dir = tempfile::tempdir().unwrap();
        let occupied = temp_dir.path().join("not-a-dir");
        std::fs::write(&occupied, b"file in the way").unwrap();

        let err = ContentStore::new(ContentStoreConfig::Local {
            path: occupied.join("blobs"),
        })
        .await
        .unwrap_err();
        assert!(matches!(err, ContentStoreError::Path { .. }));
    }
}
