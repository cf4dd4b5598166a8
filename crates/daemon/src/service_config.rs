use std::path::PathBuf;
use std::time::Duration;

use crate::files::FilesConfig;
use crate::state::{AppConfig, BlobStoreConfig};

/// Runtime configuration for one daemon process.
#[derive(Debug, Clone)]
pub struct Config {
    // http server configuration
    pub port: u16,

    // storage configuration
    /// Blob storage backend configuration
    pub blob_store: BlobStoreConfig,
    /// Blob directory used when `blob_store` is local without an explicit path
    pub blobs_path: PathBuf,
    /// a path to a sqlite database, if not set then an
    ///  in-memory database will be used
    pub sqlite_path: Option<PathBuf>,

    // file policy
    pub files: FilesConfig,
    /// Interval of the background expiry sweep, `None` disables it
    pub reap_interval: Option<Duration>,

    // logging
    pub log_level: tracing::Level,
    /// Directory for log files (optional, logs to stdout only if not set)
    pub log_dir: Option<PathBuf>,
}

impl Config {
    /// Runtime config backed by an on-disk hoard directory.
    pub fn from_app_config(app: &AppConfig, db_path: PathBuf, blobs_path: PathBuf) -> Self {
        Self {
            port: app.port,
            blob_store: app.blob_store.clone(),
            blobs_path,
            sqlite_path: Some(db_path),
            files: files_config(app),
            reap_interval: (app.reap_interval_secs > 0)
                .then(|| Duration::from_secs(app.reap_interval_secs)),
            log_level: tracing::Level::INFO,
            log_dir: None,
        }
    }

    /// Fully in-memory config, nothing touches disk.
    pub fn ephemeral(app: &AppConfig) -> Self {
        Self {
            blob_store: BlobStoreConfig::Memory,
            sqlite_path: None,
            ..Self::from_app_config(app, PathBuf::new(), PathBuf::new())
        }
    }
}

fn files_config(app: &AppConfig) -> FilesConfig {
    FilesConfig {
        max_file_size: app.max_file_size,
        min_expiration: time::Duration::hours(hours_i64(app.min_expiration_hours)),
        max_expiration: time::Duration::hours(hours_i64(app.max_expiration_hours)),
        secret_bytes: app.secret_bytes,
        io_timeout: Duration::from_secs(app.io_timeout_secs),
    }
}

// Clamped so `Duration::hours` cannot overflow.
fn hours_i64(hours: u64) -> i64 {
    const MAX_HOURS: i64 = i64::MAX / 3600;
    i64::try_from(hours).map_or(MAX_HOURS, |h| h.min(MAX_HOURS))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_app_config() {
        let app = AppConfig {
            reap_interval_secs: 0,
            ..AppConfig::default()
        };
        let config = Config::from_app_config(&app, "db.sqlite".into(), "blobs".into());
        assert!(config.reap_interval.is_none());
        assert_eq!(config.files.min_expiration, time::Duration::days(30));
        assert_eq!(config.files.max_expiration, time::Duration::days(365));
        assert_eq!(config.files.io_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_ephemeral_uses_memory() {
        let config = Config::ephemeral(&AppConfig::default());
        assert!(config.sqlite_path.is_none());
        assert!(matches!(config.blob_store, BlobStoreConfig::Memory));
        assert_eq!(config.reap_interval, Some(Duration::from_secs(3600)));
    }
}
