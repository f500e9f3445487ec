//! In-memory storage backend for tests and single-process use.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;
use tokio::sync::RwLock;

use super::{Field, FileInfo, StorageAdapter, StorageError};

#[derive(Clone, Debug)]
struct Blob {
    content: String,
    updated_at: DateTime<Utc>,
}

/// Path-keyed map guarded by an async lock. Cheap to clone-free share via
/// `Arc`; contents vanish with the process.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    blobs: RwLock<FxHashMap<String, Blob>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StorageAdapter for MemoryStorage {
    async fn get(
        &self,
        user_id: &str,
        job_id: Option<&str>,
        field: Field,
    ) -> Result<Option<String>, StorageError> {
        let path = field.location(user_id, job_id)?;
        let blobs = self.blobs.read().await;
        Ok(blobs.get(&path).map(|blob| blob.content.clone()))
    }

    async fn put(
        &self,
        user_id: &str,
        job_id: Option<&str>,
        field: Field,
        content: &str,
    ) -> Result<(), StorageError> {
        let path = field.location(user_id, job_id)?;
        let mut blobs = self.blobs.write().await;
        blobs.insert(
            path,
            Blob {
                content: content.to_string(),
                updated_at: Utc::now(),
            },
        );
        Ok(())
    }

    async fn list(
        &self,
        user_id: &str,
        job_id: Option<&str>,
    ) -> Result<Vec<FileInfo>, StorageError> {
        let prefix = match job_id {
            Some(job_id) => format!("users/{user_id}/jobs/{job_id}/"),
            None => format!("users/{user_id}/"),
        };
        let blobs = self.blobs.read().await;
        let mut entries: Vec<FileInfo> = blobs
            .iter()
            .filter(|(path, _)| path.starts_with(&prefix))
            .map(|(path, blob)| FileInfo {
                path: path.clone(),
                size: blob.content.len() as u64,
                updated_at: blob.updated_at,
            })
            .collect();
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(entries)
    }

    async fn delete(
        &self,
        user_id: &str,
        job_id: Option<&str>,
        field: Field,
    ) -> Result<bool, StorageError> {
        let path = field.location(user_id, job_id)?;
        let mut blobs = self.blobs.write().await;
        Ok(blobs.remove(&path).is_some())
    }
}
