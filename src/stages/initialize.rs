//! Eager document loading.
//!
//! Loads every input document the downstream stages need in one place, so
//! the rest of the pipeline is pure data processing with no storage reads.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::instrument;

use crate::stage::{Stage, StageContext, StageError, StageOutcome};
use crate::state::{PipelineState, StateUpdate};
use crate::storage::{Field, StorageAdapter};

/// Loads `job_description`, `original_resume`, and `full_resume` from storage
/// unless already seeded on the state. The job description and original
/// resume are mandatory; a missing full resume only narrows what the tailorer
/// can draw on.
pub struct Initialize {
    storage: Arc<dyn StorageAdapter>,
}

impl Initialize {
    #[must_use]
    pub fn new(storage: Arc<dyn StorageAdapter>) -> Self {
        Self { storage }
    }

    async fn load_if_absent(
        &self,
        current: &Option<String>,
        state: &PipelineState,
        field: Field,
    ) -> Result<Option<String>, StageError> {
        if current.is_some() {
            return Ok(None);
        }
        let job_id = (!field.is_user_scoped()).then(|| state.job_id());
        Ok(self.storage.get(state.user_id(), job_id, field).await?)
    }
}

#[async_trait]
impl Stage for Initialize {
    #[instrument(skip(self, state, ctx), fields(user_id = %state.user_id(), job_id = %state.job_id()), err)]
    async fn run(
        &self,
        state: &PipelineState,
        ctx: StageContext,
    ) -> Result<StageOutcome, StageError> {
        let mut update = StateUpdate::new();

        if let Some(content) = self
            .load_if_absent(&state.job_description, state, Field::JobDescription)
            .await?
        {
            update.job_description = Some(content);
        }
        if let Some(content) = self
            .load_if_absent(&state.original_resume, state, Field::OriginalResume)
            .await?
        {
            update.original_resume = Some(content);
        }
        if let Some(content) = self
            .load_if_absent(&state.full_resume, state, Field::FullResume)
            .await?
        {
            update.full_resume = Some(content);
        }

        if state.job_description.is_none() && update.job_description.is_none() {
            return Err(StageError::MissingInput {
                what: "job_description".into(),
            });
        }
        if state.original_resume.is_none() && update.original_resume.is_none() {
            return Err(StageError::MissingInput {
                what: "original_resume".into(),
            });
        }
        if state.full_resume.is_none() && update.full_resume.is_none() {
            ctx.note("no full resume on file, tailoring will rely on the original resume only");
        }

        Ok(StageOutcome::Advance(update))
    }
}
