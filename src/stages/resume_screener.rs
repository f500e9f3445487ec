//! Recruiter-perspective resume screening.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::instrument;

use crate::generator::{GenerationConfig, Generator, generate_with_timeout};
use crate::stage::{Stage, StageContext, StageError, StageOutcome};
use crate::state::{PipelineState, StateUpdate};
use crate::storage::{Field, StorageAdapter};

/// Evaluates the original resume the way a selective recruiter would,
/// producing the feedback document the tailoring stage works against.
pub struct ResumeScreener {
    generator: Arc<dyn Generator>,
    storage: Arc<dyn StorageAdapter>,
    config: GenerationConfig,
}

impl ResumeScreener {
    #[must_use]
    pub fn new(
        generator: Arc<dyn Generator>,
        storage: Arc<dyn StorageAdapter>,
        config: GenerationConfig,
    ) -> Self {
        Self {
            generator,
            storage,
            config,
        }
    }
}

fn screening_prompt(original_resume: &str, job_description: &str, job_strategy: &str) -> String {
    format!(
        "You are a professional recruiter evaluating candidates for a specific role.\n\
         \n\
         Assess the resume below against the job description and strategic analysis. \
         Consider that you have hundreds of candidates and need to be selective.\n\
         \n\
         Provide a comprehensive markdown analysis with:\n\
         - Pros and cons of this candidate\n\
         - Clear reasoning for accept/reject recommendation\n\
         - Specific areas where candidate excels or falls short\n\
         - Well-reasoned justification for your decision\n\
         \n\
         Be thorough and professional in your evaluation.\n\
         \n\
         RESUME:\n\
         {original_resume}\n\
         \n\
         JOB_DESCRIPTION:\n\
         {job_description}\n\
         \n\
         STRATEGIC_ANALYSIS:\n\
         {job_strategy}\n"
    )
}

#[async_trait]
impl Stage for ResumeScreener {
    #[instrument(skip(self, state, _ctx), fields(user_id = %state.user_id(), job_id = %state.job_id()), err)]
    async fn run(
        &self,
        state: &PipelineState,
        _ctx: StageContext,
    ) -> Result<StageOutcome, StageError> {
        let missing_input = |what: &str| StageError::MissingInput { what: what.into() };
        let original_resume = state
            .original_resume
            .as_deref()
            .ok_or_else(|| missing_input("original_resume"))?;
        let job_description = state
            .job_description
            .as_deref()
            .ok_or_else(|| missing_input("job_description"))?;
        let job_strategy = state
            .job_strategy
            .as_deref()
            .ok_or_else(|| missing_input("job_strategy"))?;

        let recruiter_feedback = generate_with_timeout(
            self.generator.as_ref(),
            &screening_prompt(original_resume, job_description, job_strategy),
            &self.config,
        )
        .await?;

        self.storage
            .put(
                state.user_id(),
                Some(state.job_id()),
                Field::RecruiterFeedback,
                &recruiter_feedback,
            )
            .await?;

        tracing::debug!(chars = recruiter_feedback.len(), "recruiter feedback generated");
        Ok(StageOutcome::Advance(
            StateUpdate::new().with_recruiter_feedback(recruiter_feedback),
        ))
    }
}
