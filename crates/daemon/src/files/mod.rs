//! Dedup, retention and access rules for hosted files.
//!
//! [`UploadOrchestrator`] decides storage identity and retention on ingest;
//! [`AccessController`] decides who may read or remove a record. Both share
//! one [`HashLocks`] registry so create and removal of the same content
//! hash never interleave.

mod access;
mod error;
mod locks;
mod policy;
mod token;
mod upload;

use std::time::Duration as StdDuration;

use time::Duration;

pub use access::{AccessController, ManageAction, Retrieved};
pub use error::FileError;
pub use locks::{HashGuard, HashLocks};
pub use policy::{ExpirationPolicy, PolicyError};
pub use token::{generate_token, tokens_match, MANAGEMENT_TOKEN_BYTES};
pub use upload::{Upload, UploadOrchestrator, UploadReceipt};

pub const DEFAULT_MAX_FILE_SIZE: u64 = 256 * 1024 * 1024;
pub const DEFAULT_MIN_EXPIRATION_HOURS: u64 = 30 * 24;
pub const DEFAULT_MAX_EXPIRATION_HOURS: u64 = 365 * 24;
pub const DEFAULT_SECRET_BYTES: usize = 16;
pub const DEFAULT_IO_TIMEOUT_SECS: u64 = 30;

/// Immutable settings shared by the orchestrator and controller.
#[derive(Debug, Clone)]
pub struct FilesConfig {
    pub max_file_size: u64,
    pub min_expiration: Duration,
    pub max_expiration: Duration,
    pub secret_bytes: usize,
    /// Upper bound on any single ingest, read or removal.
    pub io_timeout: StdDuration,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            min_expiration: Duration::hours(DEFAULT_MIN_EXPIRATION_HOURS as i64),
            max_expiration: Duration::hours(DEFAULT_MAX_EXPIRATION_HOURS as i64),
            secret_bytes: DEFAULT_SECRET_BYTES,
            io_timeout: StdDuration::from_secs(DEFAULT_IO_TIMEOUT_SECS),
        }
    }
}
