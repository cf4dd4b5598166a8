use std::time::Duration;

use object_store::{Blob, ContentStore, ContentStoreError};

use super::{tokens_match, FileError, HashLocks};
use crate::database::types::{DTimestamp, FileId};
use crate::database::{Database, FileRecord};

/// A visible record together with its opened blob.
#[derive(Debug)]
pub struct Retrieved {
    pub record: FileRecord,
    pub blob: Blob,
}

/// Mutations a management token holder may request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManageAction {
    Delete,
}

#[derive(Debug, Clone)]
pub struct AccessController {
    db: Database,
    store: ContentStore,
    locks: HashLocks,
    io_timeout: Duration,
}

impl AccessController {
    pub fn new(db: Database, store: ContentStore, locks: HashLocks, io_timeout: Duration) -> Self {
        Self {
            db,
            store,
            locks,
            io_timeout,
        }
    }

    /// Resolve a record for reading.
    ///
    /// Checks run in a fixed order: removal, then secret, then expiry. A
    /// wrong secret is indistinguishable from an unknown id.
    pub async fn read(&self, id: &str, secret: Option<&str>) -> Result<Retrieved, FileError> {
        let id: FileId = id.parse().map_err(|_| FileError::NotFound)?;
        tokio::time::timeout(self.io_timeout, self.read_by_id(id, secret)).await?
    }

    async fn read_by_id(&self, id: FileId, secret: Option<&str>) -> Result<Retrieved, FileError> {
        let record = FileRecord::get_by_id(id, &self.db)
            .await?
            .ok_or(FileError::NotFound)?;

        if record.removed {
            return Err(FileError::Gone);
        }

        if let Some(expected) = &record.secret_token {
            match secret {
                Some(presented) if tokens_match(expected, presented) => {}
                _ => return Err(FileError::NotFound),
            }
        }

        if record.is_expired_at(DTimestamp::now()) {
            return Err(FileError::Gone);
        }

        let blob = match self.store.get(&record.content_hash).await {
            Ok(blob) => blob,
            Err(ContentStoreError::NotFound(_)) => {
                tracing::error!(id = %record.id, hash = %record.content_hash, "blob missing for visible record");
                return Err(FileError::Internal(format!(
                    "blob {} missing",
                    record.content_hash
                )));
            }
            Err(err) => return Err(err.into()),
        };

        Ok(Retrieved { record, blob })
    }

    /// Authorized delete. Deleting an already removed record succeeds
    /// without touching storage.
    pub async fn delete(&self, id: &str, token: &str) -> Result<(), FileError> {
        self.manage(id, token, Some(ManageAction::Delete)).await
    }

    /// Authorize `token` against the record, then apply `action`.
    ///
    /// A missing action is rejected only after the token has been checked.
    pub async fn manage(
        &self,
        id: &str,
        token: &str,
        action: Option<ManageAction>,
    ) -> Result<(), FileError> {
        let id: FileId = id
            .parse()
            .map_err(|_| FileError::Validation("invalid file id".to_string()))?;

        tokio::time::timeout(self.io_timeout, self.manage_by_id(id, token, action)).await?
    }

    async fn manage_by_id(
        &self,
        id: FileId,
        token: &str,
        action: Option<ManageAction>,
    ) -> Result<(), FileError> {
        let record = FileRecord::get_by_id(id, &self.db)
            .await?
            .ok_or(FileError::NotFound)?;

        if !tokens_match(&record.management_token, token) {
            tracing::debug!(id = %id, "management token mismatch");
            return Err(FileError::Unauthorized);
        }

        match action {
            Some(ManageAction::Delete) if record.removed => Ok(()),
            Some(ManageAction::Delete) => {
                self.remove(&record, None).await?;
                Ok(())
            }
            None => Err(FileError::Validation("invalid action".to_string())),
        }
    }

    /// Remove every live record past its expiry. Returns how many were
    /// removed; individual failures are logged and skipped.
    pub async fn reap_expired(&self) -> Result<usize, FileError> {
        let now = DTimestamp::now();
        let expired =
            tokio::time::timeout(self.io_timeout, FileRecord::list_expired(now, &self.db)).await??;

        let mut removed = 0;
        for record in expired {
            let id = record.id;
            match tokio::time::timeout(self.io_timeout, self.remove(&record, Some(now))).await {
                Ok(Ok(true)) => removed += 1,
                Ok(Ok(false)) => tracing::debug!(id = %id, "record changed since listing, skipped"),
                Ok(Err(err)) => tracing::warn!(id = %id, error = %err, "failed to reap record"),
                Err(_) => tracing::warn!(id = %id, "timed out reaping record"),
            }
        }

        Ok(removed)
    }

    /// Mark a record removed and drop its blob once nothing live references
    /// the hash.
    ///
    /// `record` may be stale; the removal is decided against the stored row
    /// under the hash lock. With `expired_before` set, a record whose expiry
    /// has since moved past that instant is left alone. Returns whether this
    /// call removed the record.
    async fn remove(
        &self,
        record: &FileRecord,
        expired_before: Option<DTimestamp>,
    ) -> Result<bool, FileError> {
        let _guard = self.locks.lock(&record.content_hash).await;

        if !FileRecord::mark_removed(record.id, expired_before, &self.db).await? {
            return Ok(false);
        }

        let live = FileRecord::count_live_by_content_hash(&record.content_hash, &self.db).await?;
        if live > 0 {
            tracing::debug!(id = %record.id, hash = %record.content_hash, live, "blob still referenced");
        } else {
            match self.store.delete(&record.content_hash).await {
                Ok(true) => tracing::debug!(hash = %record.content_hash, "blob deleted"),
                Ok(false) => tracing::debug!(hash = %record.content_hash, "blob already absent"),
                Err(err) => {
                    tracing::warn!(hash = %record.content_hash, error = %err, "failed to delete blob")
                }
            }
        }

        tracing::info!(id = %record.id, "file removed");
        Ok(true)
    }
}
