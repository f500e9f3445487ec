//! Document storage behind a narrow adapter trait.
//!
//! Documents live at deterministic paths derived from the user, the job, and
//! a [`Field`]. User-scoped fields (the career documents) are shared across
//! jobs; everything else is nested under the job. Backends only ever see the
//! resolved path, so path policy lives here, in one place.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

mod memory;
#[cfg(feature = "sqlite")]
mod sqlite;

pub use memory::MemoryStorage;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStorage;

/// The named documents the pipeline reads and writes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Field {
    JobDescription,
    OriginalResume,
    FullResume,
    JobStrategy,
    RecruiterFeedback,
    TailoredResume,
    CoverLetter,
}

impl Field {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::JobDescription => "job_description",
            Self::OriginalResume => "original_resume",
            Self::FullResume => "full_resume",
            Self::JobStrategy => "job_strategy",
            Self::RecruiterFeedback => "recruiter_feedback",
            Self::TailoredResume => "tailored_resume",
            Self::CoverLetter => "cover_letter",
        }
    }

    /// Career documents are shared across all of a user's jobs.
    #[must_use]
    pub fn is_user_scoped(&self) -> bool {
        matches!(self, Self::FullResume | Self::OriginalResume)
    }

    /// Resolves the canonical storage path for this field.
    ///
    /// Job-scoped fields require a `job_id`; asking for one without it is a
    /// caller bug surfaced as [`StorageError::MissingJobId`].
    pub fn location(&self, user_id: &str, job_id: Option<&str>) -> Result<String, StorageError> {
        if self.is_user_scoped() {
            return Ok(format!("users/{user_id}/{}.md", self.as_str()));
        }
        let job_id = job_id.ok_or(StorageError::MissingJobId { field: *self })?;
        Ok(format!("users/{user_id}/jobs/{job_id}/{}.md", self.as_str()))
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata for a stored document, as returned by listings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    /// Path of the document relative to the storage root.
    pub path: String,
    /// Content length in bytes.
    pub size: u64,
    pub updated_at: DateTime<Utc>,
}

/// Errors from storage backends and path resolution.
#[derive(Debug, Error, Diagnostic)]
pub enum StorageError {
    #[error("storage backend error: {message}")]
    #[diagnostic(
        code(tailorgraph::storage::backend),
        help("Check that the storage backend is reachable and writable.")
    )]
    Backend { message: String },

    #[error("field {field} is job-scoped but no job id was supplied")]
    #[diagnostic(code(tailorgraph::storage::missing_job_id))]
    MissingJobId { field: Field },
}

/// Narrow persistence seam for documents.
#[async_trait]
pub trait StorageAdapter: Send + Sync {
    /// Fetches a document, `None` when absent.
    async fn get(
        &self,
        user_id: &str,
        job_id: Option<&str>,
        field: Field,
    ) -> Result<Option<String>, StorageError>;

    /// Creates or replaces a document.
    async fn put(
        &self,
        user_id: &str,
        job_id: Option<&str>,
        field: Field,
        content: &str,
    ) -> Result<(), StorageError>;

    /// Lists stored documents for the user: all of them when `job_id` is
    /// `None`, otherwise only the given job's documents.
    async fn list(
        &self,
        user_id: &str,
        job_id: Option<&str>,
    ) -> Result<Vec<FileInfo>, StorageError>;

    /// Removes a document. Returns whether one existed.
    async fn delete(
        &self,
        user_id: &str,
        job_id: Option<&str>,
        field: Field,
    ) -> Result<bool, StorageError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_scoped_paths_skip_the_job() {
        let path = Field::FullResume.location("alice", Some("acme-1")).unwrap();
        assert_eq!(path, "users/alice/full_resume.md");

        let path = Field::OriginalResume.location("alice", None).unwrap();
        assert_eq!(path, "users/alice/original_resume.md");
    }

    #[test]
    fn job_scoped_paths_nest_under_the_job() {
        let path = Field::TailoredResume
            .location("alice", Some("acme-1"))
            .unwrap();
        assert_eq!(path, "users/alice/jobs/acme-1/tailored_resume.md");
    }

    #[test]
    fn job_scoped_field_without_job_id_is_an_error() {
        let err = Field::CoverLetter.location("alice", None).unwrap_err();
        assert!(matches!(
            err,
            StorageError::MissingJobId {
                field: Field::CoverLetter
            }
        ));
    }
}
