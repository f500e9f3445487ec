//! Run lifecycle management on top of [`PipelineGraph`].
//!
//! The runner tracks every run it has started, keyed by a generated run id.
//! Suspended runs keep their re-entry point and an [`InfoCollection`]
//! conversation; callers either drive that conversation turn by turn or
//! resume directly with an out-of-band [`ResumeValue`]. Repeated suspensions
//! are bounded by `max_collect_cycles`, after which the run continues with
//! the best-effort draft instead of asking again.

use std::sync::Arc;

use miette::Diagnostic;
use rustc_hash::FxHashMap;
use thiserror::Error;
use tracing::instrument;
use uuid::Uuid;

use crate::collect::{CollectError, InfoCollection, TurnOutcome};
use crate::generator::{GenerationConfig, Generator};
use crate::graph::{InterruptedRun, PipelineGraph, RunResult};
use crate::interrupt::ResumeValue;
use crate::message::Turn;
use crate::state::{PipelineState, StateUpdate};
use crate::storage::StorageAdapter;

/// Tuning knobs for a [`PipelineRunner`].
#[derive(Clone, Debug)]
pub struct RunnerConfig {
    pub generation: GenerationConfig,
    /// How many times a single run may suspend before the runner stops
    /// asking and continues with what it has.
    pub max_collect_cycles: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            generation: GenerationConfig::default(),
            max_collect_cycles: 5,
        }
    }
}

/// Errors from run lifecycle operations.
#[derive(Debug, Error, Diagnostic)]
pub enum RunnerError {
    #[error("no run with id {run_id}")]
    #[diagnostic(
        code(tailorgraph::runner::unknown_run),
        help("Use the run id returned by start_run.")
    )]
    UnknownRun { run_id: String },

    #[error("run {run_id} is not suspended")]
    #[diagnostic(
        code(tailorgraph::runner::not_suspended),
        help("Only a suspended run can take conversation turns or be resumed.")
    )]
    NotSuspended { run_id: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Collect(#[from] CollectError),
}

/// Where a tracked run stands.
#[derive(Debug)]
pub enum RunStatus {
    Suspended {
        interrupted: InterruptedRun,
        collector: InfoCollection,
    },
    Completed(Box<PipelineState>),
    Failed {
        stage: crate::stage::StageKind,
        message: String,
    },
}

#[derive(Debug)]
struct RunEntry {
    status: RunStatus,
    /// Suspensions seen so far for this run.
    cycles: usize,
}

/// Result of starting a run.
#[derive(Debug)]
pub struct RunReport {
    pub run_id: String,
    pub result: RunResult,
}

/// What a conversation turn produced.
#[derive(Debug)]
pub enum ConversationProgress {
    /// Show this to the user and wait for their next message.
    Reply(Turn),
    /// The collection finished and the run continued.
    Finished(RunResult),
}

/// Owns a compiled pipeline and the runs executed against it.
pub struct PipelineRunner {
    graph: Arc<PipelineGraph>,
    generator: Arc<dyn Generator>,
    storage: Arc<dyn StorageAdapter>,
    config: RunnerConfig,
    runs: FxHashMap<String, RunEntry>,
}

impl PipelineRunner {
    #[must_use]
    pub fn new(
        graph: Arc<PipelineGraph>,
        generator: Arc<dyn Generator>,
        storage: Arc<dyn StorageAdapter>,
        config: RunnerConfig,
    ) -> Self {
        Self {
            graph,
            generator,
            storage,
            config,
            runs: FxHashMap::default(),
        }
    }

    /// Status of a tracked run, if known.
    #[must_use]
    pub fn run_status(&self, run_id: &str) -> Option<&RunStatus> {
        self.runs.get(run_id).map(|entry| &entry.status)
    }

    /// Starts a fresh run for `(user_id, job_id)` and executes it until it
    /// completes, suspends, or fails.
    #[instrument(skip(self), err)]
    pub async fn start_run(&mut self, user_id: &str, job_id: &str) -> Result<RunReport, RunnerError> {
        let run_id = Uuid::new_v4().to_string();
        let state = PipelineState::new(user_id, job_id);
        let result = self.graph.run(state).await;
        let result = self.record(&run_id, result, 0);
        Ok(RunReport { run_id, result })
    }

    /// Starts a run with a pre-populated state, for callers that already
    /// hold the input documents in memory.
    #[instrument(skip(self, state), err)]
    pub async fn start_run_with_state(
        &mut self,
        state: PipelineState,
    ) -> Result<RunReport, RunnerError> {
        let run_id = Uuid::new_v4().to_string();
        let result = self.graph.run(state).await;
        let result = self.record(&run_id, result, 0);
        Ok(RunReport { run_id, result })
    }

    /// Feeds a user message into a suspended run's collection conversation.
    ///
    /// When the conversation finishes, the run resumes automatically with
    /// the collected result.
    #[instrument(skip(self, user_message), err)]
    pub async fn start_conversation_turn(
        &mut self,
        run_id: &str,
        user_message: &str,
    ) -> Result<ConversationProgress, RunnerError> {
        let entry = self.runs.get_mut(run_id).ok_or_else(|| RunnerError::UnknownRun {
            run_id: run_id.to_string(),
        })?;
        let RunStatus::Suspended {
            interrupted,
            collector,
        } = &mut entry.status
        else {
            return Err(RunnerError::NotSuspended {
                run_id: run_id.to_string(),
            });
        };

        interrupted.state.conversation_history.push(Turn::user(user_message));
        let outcome = collector
            .user_turn(
                user_message,
                self.generator.as_ref(),
                self.storage.as_ref(),
                &self.config.generation,
            )
            .await?;

        match outcome {
            TurnOutcome::Reply(turn) => {
                interrupted.state.conversation_history.push(turn.clone());
                Ok(ConversationProgress::Reply(turn))
            }
            TurnOutcome::Complete(collection) => {
                let result = self.resume_run(run_id, collection.into()).await?;
                Ok(ConversationProgress::Finished(result))
            }
        }
    }

    /// Resumes a suspended run with out-of-band collected information.
    ///
    /// The suspending stage runs again with `collected_info` (and the
    /// updated full resume, when present) on the state.
    #[instrument(skip(self, value), err)]
    pub async fn resume_run(
        &mut self,
        run_id: &str,
        value: ResumeValue,
    ) -> Result<RunResult, RunnerError> {
        let entry = self.runs.get_mut(run_id).ok_or_else(|| RunnerError::UnknownRun {
            run_id: run_id.to_string(),
        })?;
        let RunStatus::Suspended { interrupted, .. } = &entry.status else {
            return Err(RunnerError::NotSuspended {
                run_id: run_id.to_string(),
            });
        };

        let stage = interrupted.stage;
        let stage_index = interrupted.stage_index;
        let payload = interrupted.payload.clone();
        let mut state = interrupted.state.clone();
        let cycles = entry.cycles;

        let mut update = StateUpdate::new().with_collected_info(value.collected_info);
        update.full_resume = value.updated_full_resume;
        state.apply(update, stage);

        let result = if cycles >= self.config.max_collect_cycles {
            // Out of patience: take the draft produced at suspension time
            // and move on instead of asking the user again.
            tracing::warn!(
                run_id,
                cycles,
                "collection cycle limit reached, continuing with draft"
            );
            if let Some(draft) = payload.tailored_resume {
                state.apply(
                    StateUpdate::new()
                        .with_tailored_resume(draft)
                        .with_missing_info(Vec::new()),
                    stage,
                );
            }
            self.graph.run_from(stage_index + 1, state).await
        } else {
            self.graph.run_from(stage_index, state).await
        };

        Ok(self.record(run_id, result, cycles))
    }

    /// Stores the latest status for the run and hands the result back.
    fn record(&mut self, run_id: &str, result: RunResult, previous_cycles: usize) -> RunResult {
        let (status, cycles) = match &result {
            RunResult::Completed(state) => (RunStatus::Completed(state.clone()), previous_cycles),
            RunResult::Failed(failure) => (
                RunStatus::Failed {
                    stage: failure.stage,
                    message: failure.message.clone(),
                },
                previous_cycles,
            ),
            RunResult::Suspended(interrupted) => {
                let mut interrupted = (**interrupted).clone();
                let mut collector = InfoCollection::from_interrupt(&interrupted.payload);
                if let Some(intro) = collector.begin() {
                    interrupted.state.conversation_history.push(intro);
                }
                (
                    RunStatus::Suspended {
                        interrupted,
                        collector,
                    },
                    previous_cycles + 1,
                )
            }
        };
        self.runs.insert(run_id.to_string(), RunEntry { status, cycles });
        result
    }
}

impl std::fmt::Debug for PipelineRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineRunner")
            .field("runs", &self.runs.len())
            .field("max_collect_cycles", &self.config.max_collect_cycles)
            .finish()
    }
}
