//! The stage abstraction: the unit of work a pipeline schedules.
//!
//! Mirrors a map-reduce discipline over a single record: each stage reads a
//! snapshot of the [`PipelineState`] and returns either a partial update to
//! merge or a suspension payload. Stages never mutate shared state directly.

use async_trait::async_trait;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::event::{EventEmitter, PipelineEvent};
use crate::generator::GenerationError;
use crate::interrupt::InterruptPayload;
use crate::state::{PipelineState, StateUpdate};
use crate::storage::StorageError;

/// Identity of a pipeline stage, in canonical execution order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StageKind {
    Initialize,
    JobAnalyzer,
    ResumeScreener,
    ResumeTailorer,
    CoverLetter,
}

impl StageKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initialize => "initialize",
            Self::JobAnalyzer => "job_analyzer",
            Self::ResumeScreener => "resume_screener",
            Self::ResumeTailorer => "resume_tailorer",
            Self::CoverLetter => "cover_letter",
        }
    }
}

impl std::fmt::Display for StageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-invocation context handed to a stage.
#[derive(Clone, Debug)]
pub struct StageContext {
    pub stage: StageKind,
    events: EventEmitter,
}

impl StageContext {
    #[must_use]
    pub fn new(stage: StageKind, events: EventEmitter) -> Self {
        Self { stage, events }
    }

    /// Publishes a diagnostic note tagged with this stage. Best-effort.
    pub fn note(&self, message: impl Into<String>) {
        self.events.emit(PipelineEvent::Note {
            stage: self.stage,
            message: message.into(),
        });
    }
}

/// What a stage produced.
#[derive(Clone, Debug)]
pub enum StageOutcome {
    /// Merge this update and move to the next stage.
    Advance(StateUpdate),
    /// Pause the run; the caller must supply the missing information before
    /// the pipeline can continue.
    Suspend(InterruptPayload),
}

/// Errors a stage can raise. The pipeline converts these into a recorded
/// `state.error` and a failed run rather than unwinding.
#[derive(Debug, Error, Diagnostic)]
pub enum StageError {
    #[error("missing required input: {what}")]
    #[diagnostic(
        code(tailorgraph::stage::missing_input),
        help("Upload the document to storage or seed it on the state before running.")
    )]
    MissingInput { what: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Storage(#[from] StorageError),
}

/// The unit of pipeline work.
#[async_trait]
pub trait Stage: Send + Sync {
    async fn run(
        &self,
        state: &PipelineState,
        ctx: StageContext,
    ) -> Result<StageOutcome, StageError>;
}
