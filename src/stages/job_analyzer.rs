//! Job-description analysis.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::instrument;

use crate::generator::{GenerationConfig, Generator, generate_with_timeout};
use crate::stage::{Stage, StageContext, StageError, StageOutcome};
use crate::state::{PipelineState, StateUpdate};
use crate::storage::{Field, StorageAdapter};

/// Distills a job description into a strategic analysis document covering
/// the company's requirements, culture, and recruiter psychology.
pub struct JobAnalyzer {
    generator: Arc<dyn Generator>,
    storage: Arc<dyn StorageAdapter>,
    config: GenerationConfig,
}

impl JobAnalyzer {
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

fn analysis_prompt(job_description: &str) -> String {
    format!(
        "You are an expert in recruitment strategy and organizational psychology.\n\
         \n\
         Analyze the job description below and extract the underlying company \
         requirements, strategy, and recruiter psychology. Go beyond the surface to \
         infer the psychology, motivations, and priorities of the company and its \
         recruiters.\n\
         \n\
         Create a strategic analysis document that includes:\n\
         - Company's core requirements and expectations for the role\n\
         - Insights into company culture, values, and what they truly seek in candidates\n\
         - Likely priorities and pain points of recruiters and hiring managers\n\
         - Implicit or unwritten requirements you can infer\n\
         - Recommendations for how candidates can best align with company needs\n\
         \n\
         Output only markdown.\n\
         \n\
         JOB_DESCRIPTION:\n\
         {job_description}\n"
    )
}

#[async_trait]
impl Stage for JobAnalyzer {
    #[instrument(skip(self, state, _ctx), fields(user_id = %state.user_id(), job_id = %state.job_id()), err)]
    async fn run(
        &self,
        state: &PipelineState,
        _ctx: StageContext,
    ) -> Result<StageOutcome, StageError> {
        let job_description =
            state
                .job_description
                .as_deref()
                .ok_or_else(|| StageError::MissingInput {
                    what: "job_description".into(),
                })?;

        let job_strategy = generate_with_timeout(
            self.generator.as_ref(),
            &analysis_prompt(job_description),
            &self.config,
        )
        .await?;

        self.storage
            .put(
                state.user_id(),
                Some(state.job_id()),
                Field::JobStrategy,
                &job_strategy,
            )
            .await?;

        tracing::debug!(chars = job_strategy.len(), "job strategy generated");
        Ok(StageOutcome::Advance(
            StateUpdate::new().with_job_strategy(job_strategy),
        ))
    }
}
