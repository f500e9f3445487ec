//! Job-specific resume tailoring, with gap detection.
//!
//! A single generation call produces both the tailored draft and the list of
//! information gaps, as one JSON object. When gaps come back the stage
//! suspends the run so the caller can gather answers; on re-entry the
//! collected information is substituted into the prompt and the stage runs
//! again from scratch.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::instrument;

use crate::generator::{GenerationConfig, Generator, generate_with_timeout};
use crate::interrupt::InterruptPayload;
use crate::stage::{Stage, StageContext, StageError, StageOutcome};
use crate::state::{PipelineState, StateUpdate};
use crate::storage::{Field, StorageAdapter};

/// Produces `tailored_resume` and `missing_info` from the analysis documents
/// and the candidate's resumes.
pub struct ResumeTailorer {
    generator: Arc<dyn Generator>,
    storage: Arc<dyn StorageAdapter>,
    config: GenerationConfig,
}

impl ResumeTailorer {
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

/// Shape of the model's combined answer.
#[derive(Debug, Deserialize)]
struct TailorOutput {
    #[serde(default)]
    missing_info: Vec<String>,
    tailored_resume: String,
}

/// Trims a Markdown code fence (` ``` ` or ` ```json `) wrapping the whole
/// response, which models add despite instructions not to.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.strip_prefix('\n').unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

fn tailoring_prompt(
    recruiter_feedback: &str,
    original_resume: &str,
    full_resume: &str,
    collected_info: Option<&str>,
    job_description: &str,
    job_strategy: &str,
) -> String {
    let collected_section = match collected_info {
        Some(info) => format!("\nADDITIONAL_COLLECTED_INFO:\n{info}\n"),
        None => String::new(),
    };
    format!(
        "You are a professional resume expert specializing in job-specific tailoring.\n\
         \n\
         Tailor the candidate's resume for maximum acceptance likelihood using all \
         available information, and identify any critical information still missing.\n\
         \n\
         Guidelines:\n\
         - SHOW DON'T TELL: Write about experiences that match job requirements\n\
         - Use quantifiable achievements and evidence-backed claims\n\
         - Maintain professional tone and clear structure\n\
         - Include job description keywords for ATS\n\
         - Never fabricate experiences or mischaracterize background\n\
         - Integrate additional information naturally into relevant sections\n\
         - Where the original resume and the full resume disagree, prefer the \
         original resume's wording\n\
         \n\
         Output a JSON object with exactly two keys:\n\
         - \"missing_info\": list of specific missing information or experiences that \
         would materially improve the tailoring; empty when nothing critical is missing\n\
         - \"tailored_resume\": the complete tailored resume in markdown\n\
         \n\
         Output ONLY the valid JSON content. Do not include any other text or \
         ```json``` tags.\n\
         \n\
         RECRUITER_FEEDBACK:\n\
         {recruiter_feedback}\n\
         \n\
         ORIGINAL_RESUME:\n\
         {original_resume}\n\
         \n\
         FULL_RESUME:\n\
         {full_resume}\n\
         {collected_section}\
         \n\
         JOB_DESCRIPTION:\n\
         {job_description}\n\
         \n\
         JOB_STRATEGY:\n\
         {job_strategy}\n"
    )
}

fn parse_output(raw: &str) -> TailorOutput {
    let candidate = strip_code_fence(raw);
    match serde_json::from_str::<TailorOutput>(candidate) {
        Ok(output) => output,
        Err(err) => {
            // Fail open: treat the whole response as the resume rather than
            // losing the generation.
            tracing::warn!(error = %err, "tailoring output was not valid JSON, using raw text");
            TailorOutput {
                missing_info: Vec::new(),
                tailored_resume: raw.trim().to_string(),
            }
        }
    }
}

#[async_trait]
impl Stage for ResumeTailorer {
    #[instrument(skip(self, state, ctx), fields(user_id = %state.user_id(), job_id = %state.job_id()), err)]
    async fn run(
        &self,
        state: &PipelineState,
        ctx: StageContext,
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
        let recruiter_feedback = state
            .recruiter_feedback
            .as_deref()
            .ok_or_else(|| missing_input("recruiter_feedback"))?;
        // A missing full resume narrows the material, it does not block.
        let full_resume = state.full_resume.as_deref().unwrap_or(original_resume);

        let prompt = tailoring_prompt(
            recruiter_feedback,
            original_resume,
            full_resume,
            state.collected_info.as_deref(),
            job_description,
            job_strategy,
        );
        let raw = generate_with_timeout(self.generator.as_ref(), &prompt, &self.config).await?;
        let output = parse_output(&raw);

        self.storage
            .put(
                state.user_id(),
                Some(state.job_id()),
                Field::TailoredResume,
                &output.tailored_resume,
            )
            .await?;
        tracing::debug!(chars = output.tailored_resume.len(), "tailored resume generated");

        if !output.missing_info.is_empty() {
            ctx.note(format!(
                "tailoring identified {} information gap(s)",
                output.missing_info.len()
            ));
            return Ok(StageOutcome::Suspend(InterruptPayload {
                missing_info: output.missing_info,
                tailored_resume: Some(output.tailored_resume),
                user_id: state.user_id().to_string(),
                job_id: state.job_id().to_string(),
                full_resume: state.full_resume.clone(),
            }));
        }

        Ok(StageOutcome::Advance(
            StateUpdate::new()
                .with_tailored_resume(output.tailored_resume)
                .with_missing_info(Vec::new()),
        ))
    }
}
