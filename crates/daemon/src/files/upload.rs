use bytes::Bytes;
use object_store::ContentStore;

use super::{
    generate_token, ExpirationPolicy, FileError, FilesConfig, HashLocks, MANAGEMENT_TOKEN_BYTES,
};
use crate::database::types::{DTimestamp, FileId};
use crate::database::{Database, FileRecord};

/// One inbound file.
#[derive(Debug, Clone)]
pub struct Upload {
    pub content: Bytes,
    /// SHA-256 of `content`, computed while the bytes were received.
    pub content_hash: String,
    pub original_name: String,
    pub mime_type: String,
    pub uploader_ip: String,
    pub user_agent: String,
    pub requested_hours: Option<u64>,
    pub want_secret: bool,
}

/// Capability handed back to the uploader.
#[derive(Debug, Clone)]
pub struct UploadReceipt {
    pub id: FileId,
    pub url: String,
    /// Unix seconds.
    pub expires: i64,
    /// Only present when this upload created the record.
    pub token: Option<String>,
    pub created: bool,
}

#[derive(Debug, Clone)]
pub struct UploadOrchestrator {
    db: Database,
    store: ContentStore,
    locks: HashLocks,
    policy: ExpirationPolicy,
    config: FilesConfig,
}

impl UploadOrchestrator {
    pub fn new(
        db: Database,
        store: ContentStore,
        locks: HashLocks,
        policy: ExpirationPolicy,
        config: FilesConfig,
    ) -> Self {
        Self {
            db,
            store,
            locks,
            policy,
            config,
        }
    }

    pub fn max_file_size(&self) -> u64 {
        self.config.max_file_size
    }

    /// Store an upload, or refresh the live record that already holds its
    /// content.
    pub async fn ingest(&self, upload: Upload) -> Result<UploadReceipt, FileError> {
        let size = upload.content.len() as u64;
        if size > self.config.max_file_size {
            return Err(FileError::TooLarge {
                size,
                limit: self.config.max_file_size,
            });
        }

        tokio::time::timeout(self.config.io_timeout, self.ingest_sized(upload, size)).await?
    }

    async fn ingest_sized(&self, upload: Upload, size: u64) -> Result<UploadReceipt, FileError> {
        let hash = upload.content_hash.clone();
        let _guard = self.locks.lock(&hash).await;

        let now = DTimestamp::now();
        let expires_at = self.policy.expires_at(size, upload.requested_hours, now);

        if let Some(existing) = FileRecord::get_by_content_hash(&hash, &self.db).await? {
            return self.refresh(existing, expires_at, upload.content).await;
        }

        let secret_token = upload
            .want_secret
            .then(|| generate_token(self.config.secret_bytes));
        let mut record = FileRecord {
            id: FileId::generate(),
            content_hash: hash.clone(),
            original_name: upload.original_name,
            mime_type: upload.mime_type,
            size_bytes: size as i64,
            uploader_ip: upload.uploader_ip,
            user_agent: upload.user_agent,
            secret_token,
            management_token: generate_token(MANAGEMENT_TOKEN_BYTES),
            expires_at,
            removed: false,
            created_at: now,
            updated_at: now,
        };

        match FileRecord::create(&record, &self.db).await {
            Ok(()) => {}
            Err(err) if FileRecord::is_live_hash_conflict(&err) => {
                tracing::debug!(hash = %hash, "live record appeared concurrently, refreshing it");
                let existing = FileRecord::get_by_content_hash(&hash, &self.db)
                    .await?
                    .ok_or_else(|| {
                        FileError::Internal(format!("live record for {hash} vanished"))
                    })?;
                return self.refresh(existing, expires_at, upload.content).await;
            }
            Err(err) => return Err(err.into()),
        }

        if let Err(err) = self.store.put(&hash, upload.content).await {
            // Leave no live record pointing at a blob that was never written.
            record.removed = true;
            if let Err(rollback) = record.update(&self.db).await {
                tracing::error!(id = %record.id, error = %rollback, "failed to retire record after blob write failure");
            }
            return Err(err.into());
        }

        tracing::info!(id = %record.id, hash = %hash, size, "file created");
        Ok(UploadReceipt {
            id: record.id,
            url: record.retrieval_path(),
            expires: record.expires_at.unix_timestamp(),
            token: Some(record.management_token),
            created: true,
        })
    }

    async fn refresh(
        &self,
        mut existing: FileRecord,
        expires_at: DTimestamp,
        content: Bytes,
    ) -> Result<UploadReceipt, FileError> {
        existing.expires_at = expires_at;
        existing.update(&self.db).await?;

        // Restores the blob if it went missing underneath a live record.
        if self.store.put(&existing.content_hash, content).await? {
            tracing::warn!(id = %existing.id, hash = %existing.content_hash, "restored missing blob");
        }

        tracing::info!(id = %existing.id, hash = %existing.content_hash, "file refreshed");
        Ok(UploadReceipt {
            id: existing.id,
            url: existing.retrieval_path(),
            expires: existing.expires_at.unix_timestamp(),
            token: None,
            created: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use object_store::content_hash;
    use time::Duration;

    async fn orchestrator(config: FilesConfig) -> (UploadOrchestrator, Database, ContentStore) {
        let db = Database::in_memory().await.unwrap();
        let store = ContentStore::memory();
        let policy = ExpirationPolicy::new(&config).unwrap();
        let orch = UploadOrchestrator::new(
            db.clone(),
            store.clone(),
            HashLocks::new(),
            policy,
            config,
        );
        (orch, db, store)
    }

    fn upload(content: &'static [u8]) -> Upload {
        Upload {
            content: Bytes::from_static(content),
            content_hash: content_hash(content),
            original_name: "hello.txt".to_string(),
            mime_type: "text/plain".to_string(),
            uploader_ip: "10.0.0.1".to_string(),
            user_agent: "test".to_string(),
            requested_hours: None,
            want_secret: false,
        }
    }

    #[tokio::test]
    async fn test_create_returns_token_once() {
        let (orch, db, store) = orchestrator(FilesConfig::default()).await;

        let first = orch.ingest(upload(b"hello")).await.unwrap();
        assert!(first.created);
        assert!(first.token.is_some());
        assert_eq!(first.url, format!("/{}", first.id));

        let second = orch.ingest(upload(b"hello")).await.unwrap();
        assert!(!second.created);
        assert_eq!(second.id, first.id);
        assert!(second.token.is_none());

        let hash = content_hash(b"hello");
        assert_eq!(
            FileRecord::count_live_by_content_hash(&hash, &db)
                .await
                .unwrap(),
            1
        );
        assert!(store.exists(&hash).await.unwrap());
    }

    #[tokio::test]
    async fn test_refresh_updates_expiry() {
        let (orch, db, _) = orchestrator(FilesConfig::default()).await;

        let mut short = upload(b"refresh me");
        short.requested_hours = Some(1);
        let first = orch.ingest(short).await.unwrap();

        let second = orch.ingest(upload(b"refresh me")).await.unwrap();
        assert!(second.expires > first.expires);

        let stored = FileRecord::get_by_id(first.id, &db).await.unwrap().unwrap();
        assert_eq!(stored.expires_at.unix_timestamp(), second.expires);
    }

    #[tokio::test]
    async fn test_secret_upload_url() {
        let (orch, db, _) = orchestrator(FilesConfig::default()).await;
        let mut secret = upload(b"classified");
        secret.want_secret = true;

        let receipt = orch.ingest(secret).await.unwrap();
        let stored = FileRecord::get_by_id(receipt.id, &db).await.unwrap().unwrap();
        let token = stored.secret_token.unwrap();
        assert_eq!(token.len(), 22);
        assert_eq!(receipt.url, format!("/s/{}/{}", token, receipt.id));
    }

    #[tokio::test]
    async fn test_too_large_is_rejected_before_storage() {
        let config = FilesConfig {
            max_file_size: 4,
            ..FilesConfig::default()
        };
        let (orch, _, store) = orchestrator(config).await;

        let err = orch.ingest(upload(b"too big")).await.unwrap_err();
        assert!(matches!(err, FileError::TooLarge { size: 7, limit: 4 }));
        assert!(!store.exists(&content_hash(b"too big")).await.unwrap());
    }

    #[tokio::test]
    async fn test_expiry_within_ceiling() {
        let config = FilesConfig {
            max_file_size: 1024 * 1024,
            min_expiration: Duration::days(30),
            max_expiration: Duration::days(365),
            ..FilesConfig::default()
        };
        let policy = ExpirationPolicy::new(&config).unwrap();
        let (orch, _, _) = orchestrator(config).await;

        let before = DTimestamp::now().unix_timestamp();
        let mut u = upload(b"long lived");
        u.requested_hours = Some(24 * 1000);
        let receipt = orch.ingest(u).await.unwrap();

        let ceiling = before + policy.max_lifespan(10).whole_seconds() + 1;
        assert!(receipt.expires <= ceiling);
    }

    #[tokio::test]
    async fn test_concurrent_identical_uploads_share_record() {
        let (orch, db, _) = orchestrator(FilesConfig::default()).await;

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let orch = orch.clone();
                tokio::spawn(async move { orch.ingest(upload(b"race")).await.unwrap() })
            })
            .collect();

        let mut created = 0;
        let mut ids = Vec::new();
        for task in tasks {
            let receipt = task.await.unwrap();
            created += receipt.created as usize;
            ids.push(receipt.id);
        }

        assert_eq!(created, 1);
        assert!(ids.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(
            FileRecord::count_live_by_content_hash(&content_hash(b"race"), &db)
                .await
                .unwrap(),
            1
        );
    }
}
