//! Pipeline state for the tailorgraph workflow.
//!
//! The state is a fixed-schema record: one struct with an explicit, closed set
//! of fields, each owned by exactly one stage. Stages never mutate the state
//! directly; they return a [`StateUpdate`] that the pipeline merges
//! field-by-field. This keeps the write-once contract checkable and makes
//! every mutation visible at the merge site.
//!
//! # Ownership
//!
//! | Field | Written by |
//! |-------|-----------|
//! | `job_description`, `original_resume`, `full_resume` | `initialize` (and the resume path for `full_resume`) |
//! | `job_strategy` | `job_analyzer` |
//! | `recruiter_feedback` | `resume_screener` |
//! | `tailored_resume`, `missing_info` | `resume_tailorer` |
//! | `cover_letter` | `cover_letter` |
//! | `collected_info`, `conversation_history` | the info-collection sub-pipeline |
//! | `error` | any stage, at most once per run |

use serde::{Deserialize, Serialize};

use crate::message::Turn;
use crate::stage::StageKind;

/// The mutable record threaded through a pipeline run.
///
/// Created once per `(user_id, job_id)` invocation, mutated additively by each
/// stage's [`StateUpdate`], and discarded when the run completes. The durable
/// record of a run lives in storage, not here.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineState {
    user_id: String,
    job_id: String,

    /// Input documents, eagerly loaded by the initialize stage.
    pub job_description: Option<String>,
    pub original_resume: Option<String>,
    pub full_resume: Option<String>,

    /// Per-stage outputs, each written by exactly one stage.
    pub job_strategy: Option<String>,
    pub recruiter_feedback: Option<String>,
    pub tailored_resume: Option<String>,
    pub cover_letter: Option<String>,

    /// Gaps detected by the tailoring stage; empty when no gap was detected.
    pub missing_info: Vec<String>,

    /// Information gathered by the info-collection sub-pipeline, substituted
    /// into the tailoring prompt on resume.
    pub collected_info: Option<String>,

    /// Append-only conversation history; relevant only while the
    /// info-collection sub-pipeline is active.
    pub conversation_history: Vec<Turn>,

    /// Once set, downstream stages short-circuit.
    pub error: Option<String>,
}

impl PipelineState {
    /// Creates an empty state for the given identifiers.
    #[must_use]
    pub fn new(user_id: &str, job_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            job_id: job_id.to_string(),
            job_description: None,
            original_resume: None,
            full_resume: None,
            job_strategy: None,
            recruiter_feedback: None,
            tailored_resume: None,
            cover_letter: None,
            missing_info: Vec::new(),
            collected_info: None,
            conversation_history: Vec::new(),
            error: None,
        }
    }

    /// Fluent builder for states with pre-supplied documents, mostly useful
    /// in tests and for callers that already hold the inputs in memory.
    #[must_use]
    pub fn builder(user_id: &str, job_id: &str) -> PipelineStateBuilder {
        PipelineStateBuilder {
            state: Self::new(user_id, job_id),
        }
    }

    /// Immutable run identifier, set at construction.
    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Immutable job identifier, set at construction.
    #[must_use]
    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Merges a stage's partial update into this state, field by field.
    ///
    /// The merge itself is last-write-wins; the write-once contract is a
    /// stage-level obligation. Overwriting an already-populated field is
    /// logged at warn level, except on the tailorer restart path where
    /// `tailored_resume` and `missing_info` are legitimately recomputed.
    ///
    /// Returns the names of fields that were assigned, in declaration order.
    pub fn apply(&mut self, update: StateUpdate, stage: StageKind) -> Vec<&'static str> {
        let mut updated: Vec<&'static str> = Vec::new();

        macro_rules! assign {
            ($field:ident, $allow_rewrite:expr) => {
                if let Some(value) = update.$field {
                    if self.$field.is_some() && !$allow_rewrite {
                        tracing::warn!(
                            stage = %stage,
                            field = stringify!($field),
                            "overwriting populated state field"
                        );
                    }
                    self.$field = Some(value);
                    updated.push(stringify!($field));
                }
            };
        }

        assign!(job_description, false);
        assign!(original_resume, false);
        assign!(full_resume, true);
        assign!(job_strategy, false);
        assign!(recruiter_feedback, false);
        assign!(tailored_resume, true);
        assign!(cover_letter, false);
        assign!(collected_info, true);

        if let Some(missing) = update.missing_info {
            self.missing_info = missing;
            updated.push("missing_info");
        }

        if !update.turns.is_empty() {
            self.conversation_history.extend(update.turns);
            updated.push("conversation_history");
        }

        if let Some(message) = update.error {
            if self.error.is_none() {
                self.error = Some(message);
                updated.push("error");
            }
        }

        updated
    }
}

/// Builder for [`PipelineState`] with pre-supplied fields.
#[derive(Debug)]
pub struct PipelineStateBuilder {
    state: PipelineState,
}

impl PipelineStateBuilder {
    #[must_use]
    pub fn with_job_description(mut self, content: &str) -> Self {
        self.state.job_description = Some(content.to_string());
        self
    }

    #[must_use]
    pub fn with_original_resume(mut self, content: &str) -> Self {
        self.state.original_resume = Some(content.to_string());
        self
    }

    #[must_use]
    pub fn with_full_resume(mut self, content: &str) -> Self {
        self.state.full_resume = Some(content.to_string());
        self
    }

    #[must_use]
    pub fn build(self) -> PipelineState {
        self.state
    }
}

/// Partial state update returned by stage execution.
///
/// Every field is optional so a stage only touches what it owns. The pipeline
/// merges updates via [`PipelineState::apply`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StateUpdate {
    pub job_description: Option<String>,
    pub original_resume: Option<String>,
    pub full_resume: Option<String>,
    pub job_strategy: Option<String>,
    pub recruiter_feedback: Option<String>,
    pub tailored_resume: Option<String>,
    pub cover_letter: Option<String>,
    pub missing_info: Option<Vec<String>>,
    pub collected_info: Option<String>,
    /// Turns appended to the conversation history.
    pub turns: Vec<Turn>,
    pub error: Option<String>,
}

impl StateUpdate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// An update that carries only an error message.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_job_description(mut self, content: impl Into<String>) -> Self {
        self.job_description = Some(content.into());
        self
    }

    #[must_use]
    pub fn with_original_resume(mut self, content: impl Into<String>) -> Self {
        self.original_resume = Some(content.into());
        self
    }

    #[must_use]
    pub fn with_full_resume(mut self, content: impl Into<String>) -> Self {
        self.full_resume = Some(content.into());
        self
    }

    #[must_use]
    pub fn with_job_strategy(mut self, content: impl Into<String>) -> Self {
        self.job_strategy = Some(content.into());
        self
    }

    #[must_use]
    pub fn with_recruiter_feedback(mut self, content: impl Into<String>) -> Self {
        self.recruiter_feedback = Some(content.into());
        self
    }

    #[must_use]
    pub fn with_tailored_resume(mut self, content: impl Into<String>) -> Self {
        self.tailored_resume = Some(content.into());
        self
    }

    #[must_use]
    pub fn with_cover_letter(mut self, content: impl Into<String>) -> Self {
        self.cover_letter = Some(content.into());
        self
    }

    #[must_use]
    pub fn with_missing_info(mut self, items: Vec<String>) -> Self {
        self.missing_info = Some(items);
        self
    }

    #[must_use]
    pub fn with_collected_info(mut self, content: impl Into<String>) -> Self {
        self.collected_info = Some(content.into());
        self
    }

    #[must_use]
    pub fn with_turns(mut self, turns: Vec<Turn>) -> Self {
        self.turns = turns;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_are_immutable_accessors() {
        let state = PipelineState::new("user-1", "job-9");
        assert_eq!(state.user_id(), "user-1");
        assert_eq!(state.job_id(), "job-9");
    }

    #[test]
    fn apply_assigns_owned_fields() {
        let mut state = PipelineState::new("u", "j");
        let updated = state.apply(
            StateUpdate::new().with_job_strategy("strategy doc"),
            StageKind::JobAnalyzer,
        );
        assert_eq!(updated, vec!["job_strategy"]);
        assert_eq!(state.job_strategy.as_deref(), Some("strategy doc"));
    }

    #[test]
    fn apply_is_last_write_wins() {
        let mut state = PipelineState::new("u", "j");
        state.apply(
            StateUpdate::new().with_tailored_resume("first draft"),
            StageKind::ResumeTailorer,
        );
        state.apply(
            StateUpdate::new().with_tailored_resume("second draft"),
            StageKind::ResumeTailorer,
        );
        assert_eq!(state.tailored_resume.as_deref(), Some("second draft"));
    }

    #[test]
    fn conversation_history_only_grows() {
        let mut state = PipelineState::new("u", "j");
        state.apply(
            StateUpdate::new().with_turns(vec![Turn::assistant("intro")]),
            StageKind::ResumeTailorer,
        );
        state.apply(
            StateUpdate::new().with_turns(vec![Turn::user("answer")]),
            StageKind::ResumeTailorer,
        );
        assert_eq!(state.conversation_history.len(), 2);
        assert_eq!(state.conversation_history[0].content, "intro");
        assert_eq!(state.conversation_history[1].content, "answer");
    }

    #[test]
    fn first_error_sticks() {
        let mut state = PipelineState::new("u", "j");
        state.apply(StateUpdate::error("first failure"), StageKind::JobAnalyzer);
        state.apply(
            StateUpdate::error("second failure"),
            StageKind::ResumeScreener,
        );
        assert_eq!(state.error.as_deref(), Some("first failure"));
    }

    proptest::proptest! {
        #[test]
        fn apply_never_clears_populated_fields(
            strategy in proptest::option::of("[a-z]{1,10}"),
            feedback in proptest::option::of("[a-z]{1,10}"),
            turns in proptest::collection::vec("[a-z]{1,10}", 0..4),
        ) {
            let mut state = PipelineState::builder("u", "j")
                .with_job_description("jd")
                .with_original_resume("cv")
                .build();
            state.apply(
                StateUpdate::new().with_turns(vec![Turn::assistant("intro")]),
                StageKind::ResumeTailorer,
            );
            let history_before = state.conversation_history.len();

            let mut update = StateUpdate::new()
                .with_turns(turns.iter().map(|t| Turn::user(t)).collect());
            update.job_strategy = strategy;
            update.recruiter_feedback = feedback;
            state.apply(update, StageKind::JobAnalyzer);

            proptest::prop_assert_eq!(state.job_description.as_deref(), Some("jd"));
            proptest::prop_assert_eq!(state.original_resume.as_deref(), Some("cv"));
            proptest::prop_assert!(state.conversation_history.len() >= history_before);
        }
    }

    #[test]
    fn builder_seeds_documents() {
        let state = PipelineState::builder("u", "j")
            .with_job_description("Backend engineer")
            .with_original_resume("Frontend dev, 3 yrs")
            .build();
        assert_eq!(state.job_description.as_deref(), Some("Backend engineer"));
        assert_eq!(state.original_resume.as_deref(), Some("Frontend dev, 3 yrs"));
        assert!(state.full_resume.is_none());
    }
}
