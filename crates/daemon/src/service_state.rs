use object_store::{ContentStore, ContentStoreConfig, ContentStoreError};
use url::Url;

use crate::database::{Database, DatabaseSetupError};
use crate::files::{
    AccessController, ExpirationPolicy, FilesConfig, HashLocks, PolicyError, UploadOrchestrator,
};
use crate::service_config::Config;
use crate::state::BlobStoreConfig;

/// Main service state - everything a request handler needs.
#[derive(Clone, Debug)]
pub struct State {
    database: Database,
    content_store: ContentStore,
    uploads: UploadOrchestrator,
    access: AccessController,
}

impl State {
    pub async fn from_config(config: &Config) -> Result<Self, StateSetupError> {
        // 1. Setup database
        let sqlite_database_url = match config.sqlite_path {
            Some(ref path) => {
                let path = path
                    .canonicalize()
                    .map_err(|_| StateSetupError::DatabasePathDoesNotExist)?;
                Url::parse(&format!("sqlite://{}", path.display()))
                    .map_err(|_| StateSetupError::InvalidDatabaseUrl)
            }
            None => Url::parse("sqlite::memory:").map_err(|_| StateSetupError::InvalidDatabaseUrl),
        }?;
        tracing::info!(url = %sqlite_database_url, "connecting database");
        let database = Database::connect(&sqlite_database_url).await?;

        // 2. Setup content store
        let store_config = match &config.blob_store {
            BlobStoreConfig::Memory => ContentStoreConfig::Memory,
            BlobStoreConfig::Local { path } => ContentStoreConfig::Local {
                path: path.clone().unwrap_or_else(|| config.blobs_path.clone()),
            },
        };
        tracing::info!(config = ?store_config, "opening content store");
        let content_store = ContentStore::new(store_config).await?;

        Self::new(database, content_store, config.files.clone())
    }

    /// Assemble state from already opened backends.
    pub fn new(
        database: Database,
        content_store: ContentStore,
        files: FilesConfig,
    ) -> Result<Self, StateSetupError> {
        let policy = ExpirationPolicy::new(&files)?;
        let locks = HashLocks::new();

        let access = AccessController::new(
            database.clone(),
            content_store.clone(),
            locks.clone(),
            files.io_timeout,
        );
        let uploads = UploadOrchestrator::new(
            database.clone(),
            content_store.clone(),
            locks,
            policy,
            files,
        );

        Ok(Self {
            database,
            content_store,
            uploads,
            access,
        })
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn content_store(&self) -> &ContentStore {
        &self.content_store
    }

    pub fn uploads(&self) -> &UploadOrchestrator {
        &self.uploads
    }

    pub fn access(&self) -> &AccessController {
        &self.access
    }
}

impl AsRef<Database> for State {
    fn as_ref(&self) -> &Database {
        &self.database
    }
}

impl AsRef<ContentStore> for State {
    fn as_ref(&self) -> &ContentStore {
        &self.content_store
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateSetupError {
    #[error("Database path does not exist")]
    DatabasePathDoesNotExist,
    #[error("Database setup error: {0}")]
    DatabaseSetupError(#[from] DatabaseSetupError),
    #[error("Invalid database URL")]
    InvalidDatabaseUrl,
    #[error("Content store error: {0}")]
    ContentStoreError(#[from] ContentStoreError),
    #[error("Invalid file policy: {0}")]
    PolicyError(#[from] PolicyError),
}
