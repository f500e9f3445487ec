//! Linear pipeline assembly and execution.
//!
//! A [`PipelineGraph`] is an ordered list of stages compiled from a
//! [`PipelineBuilder`]. Execution is strictly sequential: each stage sees
//! the state produced by its predecessors, and a run ends in exactly one of
//! three ways, captured by [`RunResult`].

use std::sync::Arc;

use miette::Diagnostic;
use thiserror::Error;
use tracing::instrument;

use crate::event::{EventEmitter, PipelineEvent};
use crate::interrupt::InterruptPayload;
use crate::stage::{Stage, StageContext, StageKind, StageOutcome};
use crate::state::{PipelineState, StateUpdate};

/// Errors raised while assembling a pipeline.
#[derive(Debug, Error, Diagnostic)]
pub enum BuildError {
    #[error("pipeline has no stages")]
    #[diagnostic(
        code(tailorgraph::graph::empty),
        help("Add at least one stage with PipelineBuilder::add_stage before compiling.")
    )]
    Empty,

    #[error("stage {0} added more than once")]
    #[diagnostic(code(tailorgraph::graph::duplicate_stage))]
    DuplicateStage(StageKind),
}

/// Fluent builder for a [`PipelineGraph`].
#[derive(Default)]
pub struct PipelineBuilder {
    stages: Vec<(StageKind, Arc<dyn Stage>)>,
    events: EventEmitter,
}

impl PipelineBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a stage; execution order is insertion order.
    #[must_use]
    pub fn add_stage(mut self, kind: StageKind, stage: Arc<dyn Stage>) -> Self {
        self.stages.push((kind, stage));
        self
    }

    /// Routes run events to the given emitter.
    #[must_use]
    pub fn with_events(mut self, events: EventEmitter) -> Self {
        self.events = events;
        self
    }

    /// Validates the assembly and produces an executable pipeline.
    pub fn compile(self) -> Result<PipelineGraph, BuildError> {
        if self.stages.is_empty() {
            return Err(BuildError::Empty);
        }
        for (i, (kind, _)) in self.stages.iter().enumerate() {
            if self.stages[..i].iter().any(|(other, _)| other == kind) {
                return Err(BuildError::DuplicateStage(*kind));
            }
        }
        Ok(PipelineGraph {
            stages: self.stages,
            events: self.events,
        })
    }
}

/// How a pipeline run ended.
#[derive(Clone, Debug)]
pub enum RunResult {
    /// Every stage ran; the state holds all outputs.
    Completed(Box<PipelineState>),
    /// A stage suspended awaiting missing information.
    Suspended(Box<InterruptedRun>),
    /// A stage raised an error; the state records it and downstream stages
    /// were skipped.
    Failed(RunFailure),
}

/// A run paused mid-flight, carrying everything needed to continue it.
#[derive(Clone, Debug)]
pub struct InterruptedRun {
    /// The stage that suspended.
    pub stage: StageKind,
    /// Index of that stage in the pipeline, for re-entry.
    pub stage_index: usize,
    pub payload: InterruptPayload,
    /// State as of the suspension, including the recorded `missing_info`.
    pub state: PipelineState,
}

/// Terminal failure record for a run.
#[derive(Clone, Debug)]
pub struct RunFailure {
    pub stage: StageKind,
    pub message: String,
    pub state: PipelineState,
}

/// Compiled, executable pipeline.
pub struct PipelineGraph {
    stages: Vec<(StageKind, Arc<dyn Stage>)>,
    events: EventEmitter,
}

impl PipelineGraph {
    /// Runs the pipeline from the first stage.
    pub async fn run(&self, state: PipelineState) -> RunResult {
        self.run_from(0, state).await
    }

    /// Position of a stage in this pipeline, if present.
    #[must_use]
    pub fn position(&self, kind: StageKind) -> Option<usize> {
        self.stages.iter().position(|(k, _)| *k == kind)
    }

    /// Runs the pipeline starting at `start_index`, used to re-enter a
    /// suspended run at its suspension point.
    #[instrument(skip(self, state), fields(user_id = %state.user_id(), job_id = %state.job_id()))]
    pub async fn run_from(&self, start_index: usize, mut state: PipelineState) -> RunResult {
        for (index, (kind, stage)) in self.stages.iter().enumerate().skip(start_index) {
            // Fail fast: once a stage has recorded an error nothing else runs.
            if let Some(message) = state.error.clone() {
                return RunResult::Failed(RunFailure {
                    stage: *kind,
                    message,
                    state,
                });
            }

            self.events.emit(PipelineEvent::StageStarted { stage: *kind });
            let ctx = StageContext::new(*kind, self.events.clone());

            match stage.run(&state, ctx).await {
                Ok(StageOutcome::Advance(update)) => {
                    let updated = state.apply(update, *kind);
                    self.events.emit(PipelineEvent::StageCompleted {
                        stage: *kind,
                        updated_fields: updated.iter().map(|f| (*f).to_string()).collect(),
                    });
                }
                Ok(StageOutcome::Suspend(payload)) => {
                    state.missing_info = payload.missing_info.clone();
                    if state.tailored_resume.is_none() {
                        state.tailored_resume = payload.tailored_resume.clone();
                    }
                    self.events.emit(PipelineEvent::Suspended {
                        stage: *kind,
                        missing_info: payload.missing_info.clone(),
                    });
                    tracing::info!(stage = %kind, gaps = payload.missing_info.len(), "run suspended");
                    return RunResult::Suspended(Box::new(InterruptedRun {
                        stage: *kind,
                        stage_index: index,
                        payload,
                        state,
                    }));
                }
                Err(err) => {
                    let message = err.to_string();
                    tracing::error!(stage = %kind, error = %message, "stage failed");
                    state.apply(StateUpdate::error(message.clone()), *kind);
                    self.events.emit(PipelineEvent::StageFailed {
                        stage: *kind,
                        message: message.clone(),
                    });
                    return RunResult::Failed(RunFailure {
                        stage: *kind,
                        message,
                        state,
                    });
                }
            }
        }

        RunResult::Completed(Box::new(state))
    }
}

impl std::fmt::Debug for PipelineGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineGraph")
            .field(
                "stages",
                &self.stages.iter().map(|(k, _)| *k).collect::<Vec<_>>(),
            )
            .finish()
    }
}
