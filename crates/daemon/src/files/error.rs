use object_store::ContentStoreError;

/// Outcome taxonomy for upload, read and manage operations.
///
/// Storage failures of any kind collapse into `Internal` so callers never
/// see backend details.
#[derive(Debug, thiserror::Error)]
pub enum FileError {
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("file is {size} bytes, limit is {limit}")]
    TooLarge { size: u64, limit: u64 },

    #[error("file not found")]
    NotFound,

    #[error("file is gone")]
    Gone,

    #[error("invalid management token")]
    Unauthorized,

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for FileError {
    fn from(err: sqlx::Error) -> Self {
        FileError::Internal(format!("metadata store: {err}"))
    }
}

impl From<ContentStoreError> for FileError {
    fn from(err: ContentStoreError) -> Self {
        FileError::Internal(format!("content store: {err}"))
    }
}

impl From<tokio::time::error::Elapsed> for FileError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        FileError::Internal("operation timed out".to_string())
    }
}
