//! SQLite-backed storage for documents that must outlive the process.
//!
//! One `blobs` table keyed by the canonical document path; the scoping
//! columns exist for ad-hoc querying with the `sqlite3` shell, the adapter
//! itself only ever filters on `path`. Schema creation runs on connect and
//! is idempotent.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool, sqlite::SqliteRow};
use tracing::instrument;

use super::{Field, FileInfo, StorageAdapter, StorageError};

/// Environment variable consulted by [`SqliteStorage::connect_from_env`].
pub const DATABASE_URL_ENV: &str = "TAILORGRAPH_SQLITE_URL";

/// Durable document store over a shared SQLite pool.
pub struct SqliteStorage {
    pool: Arc<SqlitePool>,
}

impl std::fmt::Debug for SqliteStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStorage").finish()
    }
}

fn backend_err(context: &str, err: impl std::fmt::Display) -> StorageError {
    StorageError::Backend {
        message: format!("{context}: {err}"),
    }
}

impl SqliteStorage {
    /// Connect (or create) a SQLite database at `database_url`.
    /// Example URL: `sqlite://tailorgraph.db`.
    ///
    /// SQLite refuses to open a missing file through a URL, so the file is
    /// created up front for plain `sqlite://path` URLs.
    #[instrument(skip(database_url))]
    pub async fn connect(database_url: &str) -> Result<Self, StorageError> {
        if let Some(path) = database_url
            .strip_prefix("sqlite://")
            .filter(|p| !p.is_empty() && *p != ":memory:")
        {
            if let Some(parent) = std::path::Path::new(path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)
                        .map_err(|e| backend_err("create db directory", e))?;
                }
            }
            if !std::path::Path::new(path).exists() {
                std::fs::File::create(path).map_err(|e| backend_err("create db file", e))?;
            }
        }

        let pool = SqlitePool::connect(database_url)
            .await
            .map_err(|e| backend_err("connect error", e))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS blobs (
                path       TEXT PRIMARY KEY,
                user_id    TEXT NOT NULL,
                job_id     TEXT,
                field      TEXT NOT NULL,
                content    TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await
        .map_err(|e| backend_err("create schema", e))?;

        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    /// Connects using the URL in [`DATABASE_URL_ENV`], loading `.env` first.
    pub async fn connect_from_env() -> Result<Self, StorageError> {
        let _ = dotenvy::dotenv();
        let url = std::env::var(DATABASE_URL_ENV).map_err(|_| StorageError::Backend {
            message: format!("{DATABASE_URL_ENV} is not set"),
        })?;
        Self::connect(&url).await
    }
}

fn row_to_file_info(row: &SqliteRow) -> Result<FileInfo, StorageError> {
    let path: String = row
        .try_get("path")
        .map_err(|e| backend_err("read path column", e))?;
    let size: i64 = row
        .try_get("size")
        .map_err(|e| backend_err("read size column", e))?;
    let updated_at_raw: String = row
        .try_get("updated_at")
        .map_err(|e| backend_err("read updated_at column", e))?;
    let updated_at = updated_at_raw
        .parse::<DateTime<Utc>>()
        .map_err(|e| backend_err("parse updated_at", e))?;
    Ok(FileInfo {
        path,
        size: size.max(0) as u64,
        updated_at,
    })
}

#[async_trait]
impl StorageAdapter for SqliteStorage {
    #[instrument(skip(self), err)]
    async fn get(
        &self,
        user_id: &str,
        job_id: Option<&str>,
        field: Field,
    ) -> Result<Option<String>, StorageError> {
        let path = field.location(user_id, job_id)?;
        let row: Option<SqliteRow> = sqlx::query("SELECT content FROM blobs WHERE path = ?1")
            .bind(&path)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| backend_err("select blob", e))?;

        match row {
            Some(row) => {
                let content: String = row
                    .try_get("content")
                    .map_err(|e| backend_err("read content column", e))?;
                Ok(Some(content))
            }
            None => Ok(None),
        }
    }

    #[instrument(skip(self, content), err)]
    async fn put(
        &self,
        user_id: &str,
        job_id: Option<&str>,
        field: Field,
        content: &str,
    ) -> Result<(), StorageError> {
        let path = field.location(user_id, job_id)?;
        sqlx::query(
            r#"
            INSERT INTO blobs (path, user_id, job_id, field, content, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(path) DO UPDATE SET
                content = excluded.content,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&path)
        .bind(user_id)
        .bind(job_id)
        .bind(field.as_str())
        .bind(content)
        .bind(Utc::now().to_rfc3339())
        .execute(&*self.pool)
        .await
        .map_err(|e| backend_err("upsert blob", e))?;
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn list(
        &self,
        user_id: &str,
        job_id: Option<&str>,
    ) -> Result<Vec<FileInfo>, StorageError> {
        let rows = sqlx::query(
            r#"
            SELECT path, LENGTH(content) AS size, updated_at
            FROM blobs
            WHERE user_id = ?1 AND (?2 IS NULL OR job_id = ?2)
            ORDER BY path
            "#,
        )
        .bind(user_id)
        .bind(job_id)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| backend_err("list blobs", e))?;

        rows.iter().map(row_to_file_info).collect()
    }

    #[instrument(skip(self), err)]
    async fn delete(
        &self,
        user_id: &str,
        job_id: Option<&str>,
        field: Field,
    ) -> Result<bool, StorageError> {
        let path = field.location(user_id, job_id)?;
        let result = sqlx::query("DELETE FROM blobs WHERE path = ?1")
            .bind(&path)
            .execute(&*self.pool)
            .await
            .map_err(|e| backend_err("delete blob", e))?;
        Ok(result.rows_affected() > 0)
    }
}
