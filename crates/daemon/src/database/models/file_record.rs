use sqlx::FromRow;

use crate::database::types::{DTimestamp, FileId};
use crate::database::Database;

const SELECT_COLUMNS: &str = r#"
    SELECT
        id, content_hash, original_name, mime_type, size_bytes,
        uploader_ip, user_agent, secret_token, management_token,
        expires_at, removed, created_at, updated_at
    FROM files
"#;

/// Metadata for one upload. Many records may point at the same blob.
#[derive(Debug, Clone, FromRow)]
pub struct FileRecord {
    pub id: FileId,
    pub content_hash: String,
    pub original_name: String,
    pub mime_type: String,
    pub size_bytes: i64,
    pub uploader_ip: String,
    pub user_agent: String,
    pub secret_token: Option<String>,
    pub management_token: String,
    pub expires_at: DTimestamp,
    pub removed: bool,
    pub created_at: DTimestamp,
    pub updated_at: DTimestamp,
}

impl FileRecord {
    /// Insert a new record.
    ///
    /// Fails with a unique violation when a live record for the same
    /// content hash already exists; see [`FileRecord::is_live_hash_conflict`].
    pub async fn create(record: &FileRecord, db: &Database) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO files (
                id, content_hash, original_name, mime_type, size_bytes,
                uploader_ip, user_agent, secret_token, management_token,
                expires_at, removed, created_at, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
        )
        .bind(record.id)
        .bind(&record.content_hash)
        .bind(&record.original_name)
        .bind(&record.mime_type)
        .bind(record.size_bytes)
        .bind(&record.uploader_ip)
        .bind(&record.user_agent)
        .bind(&record.secret_token)
        .bind(&record.management_token)
        .bind(record.expires_at)
        .bind(record.removed)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&**db)
        .await?;

        Ok(())
    }

    pub async fn get_by_id(id: FileId, db: &Database) -> Result<Option<FileRecord>, sqlx::Error> {
        sqlx::query_as::<_, FileRecord>(&format!("{SELECT_COLUMNS} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&**db)
            .await
    }

    /// Most recently updated live record for a content hash.
    pub async fn get_by_content_hash(
        content_hash: &str,
        db: &Database,
    ) -> Result<Option<FileRecord>, sqlx::Error> {
        sqlx::query_as::<_, FileRecord>(&format!(
            "{SELECT_COLUMNS} WHERE content_hash = ?1 AND removed = 0 \
             ORDER BY updated_at DESC LIMIT 1"
        ))
        .bind(content_hash)
        .fetch_optional(&**db)
        .await
    }

    /// Persist `expires_at` and `removed`, bumping `updated_at`.
    ///
    /// `removed` only ever moves from false to true in storage; writing
    /// `false` over a removed row leaves it removed.
    pub async fn update(&mut self, db: &Database) -> Result<(), sqlx::Error> {
        let updated_at = DTimestamp::now();

        let result = sqlx::query(
            r#"
            UPDATE files
            SET expires_at = ?1, removed = MAX(removed, ?2), updated_at = ?3
            WHERE id = ?4
            "#,
        )
        .bind(self.expires_at)
        .bind(self.removed)
        .bind(updated_at)
        .bind(self.id)
        .execute(&**db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(sqlx::Error::RowNotFound);
        }

        self.updated_at = updated_at;
        Ok(())
    }

    /// Flip a live record to removed, leaving every other column as stored.
    ///
    /// With `expired_before` set the row is only touched if it is still
    /// expired at that instant, so a record refreshed since it was listed
    /// survives. Returns whether this call performed the removal.
    pub async fn mark_removed(
        id: FileId,
        expired_before: Option<DTimestamp>,
        db: &Database,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE files
            SET removed = 1, updated_at = ?1
            WHERE id = ?2 AND removed = 0 AND (?3 IS NULL OR expires_at < ?3)
            "#,
        )
        .bind(DTimestamp::now())
        .bind(id)
        .bind(expired_before)
        .execute(&**db)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Live records whose expiry is before `now`, oldest first.
    pub async fn list_expired(
        now: DTimestamp,
        db: &Database,
    ) -> Result<Vec<FileRecord>, sqlx::Error> {
        sqlx::query_as::<_, FileRecord>(&format!(
            "{SELECT_COLUMNS} WHERE removed = 0 AND expires_at < ?1 ORDER BY expires_at ASC"
        ))
        .bind(now)
        .fetch_all(&**db)
        .await
    }

    /// Number of live records referencing a content hash.
    pub async fn count_live_by_content_hash(
        content_hash: &str,
        db: &Database,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM files WHERE content_hash = ?1 AND removed = 0",
        )
        .bind(content_hash)
        .fetch_one(&**db)
        .await
    }

    /// Whether an insert failed because the hash already has a live record.
    pub fn is_live_hash_conflict(err: &sqlx::Error) -> bool {
        matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
    }

    pub fn is_expired_at(&self, now: DTimestamp) -> bool {
        now > self.expires_at
    }

    /// Path under which the record is served.
    pub fn retrieval_path(&self) -> String {
        match &self.secret_token {
            Some(secret) => format!("/s/{}/{}", secret, self.id),
            None => format!("/{}", self.id),
        }
    }
}
