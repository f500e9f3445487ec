//! Cover-letter generation from the finished tailoring artifacts.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::instrument;

use crate::generator::{GenerationConfig, Generator, generate_with_timeout};
use crate::stage::{Stage, StageContext, StageError, StageOutcome};
use crate::state::{PipelineState, StateUpdate};
use crate::storage::{Field, StorageAdapter};

/// Writes a short cover letter that complements the tailored resume and
/// preempts the concerns raised in the recruiter feedback.
pub struct CoverLetter {
    generator: Arc<dyn Generator>,
    storage: Arc<dyn StorageAdapter>,
    config: GenerationConfig,
}

impl CoverLetter {
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

fn cover_letter_prompt(
    job_description: &str,
    tailored_resume: &str,
    recruiter_feedback: &str,
    full_resume: &str,
) -> String {
    format!(
        "You are a professional cover letter writer. Generate a compelling cover letter \
         that addresses the specific job requirements and recruiter concerns.\n\
         \n\
         Your main goal is to create a cover letter that helps the candidate's overall \
         application for the job. Focus on content that addresses recruiter concerns and \
         highlights the candidate's strengths and fit for the role.\n\
         \n\
         Key Analysis and Generation Guidelines:\n\
         - Consider the weaknesses highlighted in the recruiter feedback and how the \
         cover letter can help support or explain any weaknesses indirectly to increase \
         the chance the recruiter accepts the candidate's application.\n\
         - Consider the ideal strengths/general experience the candidate has that might \
         not be fully explained in the resume or could be explained more that would help \
         the overall chance for the recruiter to accept the application.\n\
         - You may want to add some extra details about the candidate included in the \
         full resume that would help the application but are not present in the tailored \
         resume.\n\
         - Overall, consider the psychology and goals of the recruiter and how they \
         might assess the application and how this cover letter can help the candidate's \
         overall application.\n\
         - Write for brevity (200-500 words max), show do not tell. Consider what makes \
         an ideal cover letter and apply those principles to what you write.\n\
         - If possible make it unique in an appropriate way / creatively different that \
         could help attract more attention.\n\
         \n\
         ---\n\
         \n\
         **Job Description:**\n\
         {job_description}\n\
         \n\
         ---\n\
         \n\
         **Tailored Resume:**\n\
         {tailored_resume}\n\
         \n\
         ---\n\
         \n\
         **Recruiter Feedback:**\n\
         {recruiter_feedback}\n\
         \n\
         ---\n\
         \n\
         **Full Resume:**\n\
         {full_resume}\n\
         \n\
         ---\n\
         \n\
         Generate a professional cover letter that complements the resume and addresses \
         the role requirements. Return ONLY the cover letter content.\n"
    )
}

#[async_trait]
impl Stage for CoverLetter {
    #[instrument(skip(self, state, _ctx), fields(user_id = %state.user_id(), job_id = %state.job_id()), err)]
    async fn run(
        &self,
        state: &PipelineState,
        _ctx: StageContext,
    ) -> Result<StageOutcome, StageError> {
        let missing_input = |what: &str| StageError::MissingInput { what: what.into() };
        let tailored_resume = state
            .tailored_resume
            .as_deref()
            .ok_or_else(|| missing_input("tailored_resume"))?;
        let recruiter_feedback = state
            .recruiter_feedback
            .as_deref()
            .ok_or_else(|| missing_input("recruiter_feedback"))?;
        let job_description = state
            .job_description
            .as_deref()
            .ok_or_else(|| missing_input("job_description"))?;
        let full_resume = state.full_resume.as_deref().unwrap_or_default();

        let cover_letter = generate_with_timeout(
            self.generator.as_ref(),
            &cover_letter_prompt(job_description, tailored_resume, recruiter_feedback, full_resume),
            &self.config,
        )
        .await?;

        if cover_letter.trim().is_empty() {
            return Err(crate::generator::GenerationError::Provider {
                message: "cover letter generation returned empty content".into(),
            }
            .into());
        }

        self.storage
            .put(
                state.user_id(),
                Some(state.job_id()),
                Field::CoverLetter,
                &cover_letter,
            )
            .await?;

        tracing::debug!(chars = cover_letter.len(), "cover letter generated");
        Ok(StageOutcome::Advance(
            StateUpdate::new().with_cover_letter(cover_letter),
        ))
    }
}
