use std::{fs, path::PathBuf};

use serde::{Deserialize, Serialize};

use crate::files::{
    DEFAULT_IO_TIMEOUT_SECS, DEFAULT_MAX_EXPIRATION_HOURS, DEFAULT_MAX_FILE_SIZE,
    DEFAULT_MIN_EXPIRATION_HOURS, DEFAULT_SECRET_BYTES,
};

pub const APP_NAME: &str = "hoard";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const DB_FILE_NAME: &str = "db.sqlite";
pub const BLOBS_DIR_NAME: &str = "blobs";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Port for the HTTP server
    #[serde(default = "default_port")]
    pub port: u16,
    /// Largest accepted upload, in bytes
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    /// Retention for files at the size limit
    #[serde(default = "default_min_expiration_hours")]
    pub min_expiration_hours: u64,
    /// Retention for empty files
    #[serde(default = "default_max_expiration_hours")]
    pub max_expiration_hours: u64,
    /// Random bytes behind each secret URL token
    #[serde(default = "default_secret_bytes")]
    pub secret_bytes: usize,
    /// Seconds between expiry sweeps, 0 disables the background reaper
    #[serde(default = "default_reap_interval_secs")]
    pub reap_interval_secs: u64,
    /// Upper bound on a single storage operation
    #[serde(default = "default_io_timeout_secs")]
    pub io_timeout_secs: u64,
    /// Where blob bytes live
    #[serde(default)]
    pub blob_store: BlobStoreConfig,
}

fn default_port() -> u16 {
    8080
}

fn default_max_file_size() -> u64 {
    DEFAULT_MAX_FILE_SIZE
}

fn default_min_expiration_hours() -> u64 {
    DEFAULT_MIN_EXPIRATION_HOURS
}

fn default_max_expiration_hours() -> u64 {
    DEFAULT_MAX_EXPIRATION_HOURS
}

fn default_secret_bytes() -> usize {
    DEFAULT_SECRET_BYTES
}

fn default_reap_interval_secs() -> u64 {
    3600
}

fn default_io_timeout_secs() -> u64 {
    DEFAULT_IO_TIMEOUT_SECS
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            max_file_size: default_max_file_size(),
            min_expiration_hours: default_min_expiration_hours(),
            max_expiration_hours: default_max_expiration_hours(),
            secret_bytes: default_secret_bytes(),
            reap_interval_secs: default_reap_interval_secs(),
            io_timeout_secs: default_io_timeout_secs(),
            blob_store: BlobStoreConfig::default(),
        }
    }
}

/// Configuration for the blob storage backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlobStoreConfig {
    /// Local filesystem, one file per content hash
    Local {
        /// Blob directory (defaults to hoard_dir/blobs/)
        path: Option<PathBuf>,
    },

    /// Process memory; contents are lost on exit
    Memory,
}

impl Default for BlobStoreConfig {
    fn default() -> Self {
        BlobStoreConfig::Local { path: None }
    }
}

#[derive(Debug, Clone)]
pub struct AppState {
    /// Path to the hoard directory (~/.hoard)
    pub hoard_dir: PathBuf,
    /// Path to the SQLite database
    pub db_path: PathBuf,
    /// Path to the blobs directory
    pub blobs_path: PathBuf,
    /// Path to the config file
    pub config_path: PathBuf,
    /// Loaded configuration
    pub config: AppConfig,
}

impl AppState {
    /// Get the hoard directory path (custom or default ~/.hoard)
    pub fn hoard_dir(custom_path: Option<PathBuf>) -> Result<PathBuf, StateError> {
        if let Some(path) = custom_path {
            return Ok(path);
        }

        let home = dirs::home_dir().ok_or(StateError::NoHomeDirectory)?;
        Ok(home.join(format!(".{}", APP_NAME)))
    }

    /// Initialize a new hoard state directory
    pub fn init(
        custom_path: Option<PathBuf>,
        config: Option<AppConfig>,
    ) -> Result<Self, StateError> {
        let hoard_dir = Self::hoard_dir(custom_path)?;

        if hoard_dir.exists() {
            return Err(StateError::AlreadyInitialized);
        }

        fs::create_dir_all(&hoard_dir)?;

        let blobs_path = hoard_dir.join(BLOBS_DIR_NAME);
        fs::create_dir_all(&blobs_path)?;

        let config = config.unwrap_or_default();
        let config_path = hoard_dir.join(CONFIG_FILE_NAME);
        let config_toml = toml::to_string_pretty(&config)?;
        fs::write(&config_path, config_toml)?;

        // Empty file; migrations run when the daemon connects
        let db_path = hoard_dir.join(DB_FILE_NAME);
        fs::write(&db_path, "")?;

        Ok(Self {
            hoard_dir,
            db_path,
            blobs_path,
            config_path,
            config,
        })
    }

    /// Load existing state from hoard directory
    pub fn load(custom_path: Option<PathBuf>) -> Result<Self, StateError> {
        let hoard_dir = Self::hoard_dir(custom_path)?;

        if !hoard_dir.exists() {
            return Err(StateError::NotInitialized);
        }

        let db_path = hoard_dir.join(DB_FILE_NAME);
        let blobs_path = hoard_dir.join(BLOBS_DIR_NAME);
        let config_path = hoard_dir.join(CONFIG_FILE_NAME);

        if !db_path.exists() {
            return Err(StateError::MissingFile(DB_FILE_NAME.to_string()));
        }
        if !config_path.exists() {
            return Err(StateError::MissingFile(CONFIG_FILE_NAME.to_string()));
        }

        let config_toml = fs::read_to_string(&config_path)?;
        let config: AppConfig = toml::from_str(&config_toml)?;

        Ok(Self {
            hoard_dir,
            db_path,
            blobs_path,
            config_path,
            config,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("hoard directory not initialized. Run 'hoard init' first")]
    NotInitialized,

    #[error("hoard directory already initialized")]
    AlreadyInitialized,

    #[error("no home directory found")]
    NoHomeDirectory,

    #[error("missing required file: {0}")]
    MissingFile(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("hoard");

        let created = AppState::init(Some(root.clone()), None).unwrap();
        assert!(created.blobs_path.is_dir());
        assert!(created.db_path.is_file());

        let loaded = AppState::load(Some(root.clone())).unwrap();
        assert_eq!(loaded.config.port, 8080);
        assert_eq!(loaded.config.max_file_size, 256 * 1024 * 1024);
        assert_eq!(loaded.blobs_path, root.join(BLOBS_DIR_NAME));

        assert!(matches!(
            AppState::init(Some(root), None),
            Err(StateError::AlreadyInitialized)
        ));
    }

    #[test]
    fn test_load_uninitialized() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            AppState::load(Some(dir.path().join("missing"))),
            Err(StateError::NotInitialized)
        ));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            port = 9000

            [blob_store]
            type = "memory"
            "#,
        )
        .unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.secret_bytes, 16);
        assert_eq!(config.min_expiration_hours, 720);
        assert_eq!(config.max_expiration_hours, 8760);
        assert!(matches!(config.blob_store, BlobStoreConfig::Memory));
    }
}
