//! Content-addressed blob storage.
//!
//! Blobs are immutable and keyed by the lowercase hex SHA-256 of their
//! bytes. The store holds at most one object per distinct hash no matter
//! how many logical files reference it; callers own reference tracking.
//!
//! # Backends
//!
//! - Local filesystem: one file per hash directly under the configured root
//! - In-memory: for tests and ephemeral runs
//!
//! # Example
//!
//! ```rust,no_run
//! use hoard_object_store::{content_hash, ContentStore, ContentStoreConfig};
//! use std::path::PathBuf;
//!
//! # async fn example() -> Result<(), hoard_object_store::ContentStoreError> {
//! let store = ContentStore::new(ContentStoreConfig::Local {
//!     path: PathBuf::from("/tmp/hoard-blobs"),
//! })
//! .await?;
//!
//! let data = bytes::Bytes::from_static(b"hello");
//! let hash = content_hash(&data);
//! store.put(&hash, data).await?;
//! let blob = store.get(&hash).await?;
//! assert_eq!(blob.size, 5);
//! # Ok(())
//! # }
//! ```

mod error;
mod hash;
mod storage;

pub use error::{ContentStoreError, Result};
pub use hash::{content_hash, is_valid_hash, ContentHasher, HASH_HEX_LEN};
pub use storage::{Blob, ContentStore, ContentStoreConfig};
