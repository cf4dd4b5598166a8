//! Error types for the content store.

use std::path::PathBuf;

/// Errors that can occur when working with the content store.
#[derive(Debug, thiserror::Error)]
pub enum ContentStoreError {
    /// Object storage error
    #[error("object storage error: {0}")]
    ObjectStore(#[from] object_store::Error),

    /// Not a 64 character lowercase hex SHA-256
    #[error("invalid content hash: {0}")]
    InvalidHash(String),

    /// Blob not found
    #[error("blob not found: {0}")]
    NotFound(String),

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Storage root could not be prepared
    #[error("storage root {} unusable: {source}", path.display())]
    Path {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for content store operations.
pub type Result<T> = std::result::Result<T, ContentStoreError>;
