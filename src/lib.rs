//! # Tailorgraph: Stage-driven Resume Tailoring Pipeline
//!
//! Tailorgraph turns a job description and a candidate's resumes into a
//! tailored resume and cover letter through a linear pipeline of
//! generation stages, with a suspend/resume protocol for gathering missing
//! information from the user mid-run.
//!
//! ## Core Concepts
//!
//! - **Stages**: Async units of work that read the state and return a
//!   partial update or a suspension
//! - **State**: A fixed-schema record; every field is owned by exactly one
//!   stage and written at most once per run
//! - **Suspension**: The tailoring stage pauses the run when information is
//!   missing; the caller collects answers and resumes
//! - **Storage**: Stage outputs persist through a pluggable adapter as they
//!   are produced
//!
//! ## Quick Start
//!
//! ```
//! use std::collections::VecDeque;
//! use std::sync::{Arc, Mutex};
//!
//! use async_trait::async_trait;
//! use tailorgraph::generator::{GenerationConfig, GenerationError, Generator};
//! use tailorgraph::graph::RunResult;
//! use tailorgraph::stages::full_pipeline;
//! use tailorgraph::state::PipelineState;
//! use tailorgraph::storage::MemoryStorage;
//!
//! // Canned generator standing in for a real model backend.
//! struct Scripted(Mutex<VecDeque<String>>);
//!
//! #[async_trait]
//! impl Generator for Scripted {
//!     async fn generate(
//!         &self,
//!         _prompt: &str,
//!         _config: &GenerationConfig,
//!     ) -> Result<String, GenerationError> {
//!         self.0.lock().unwrap().pop_front().ok_or(GenerationError::Provider {
//!             message: "script exhausted".into(),
//!         })
//!     }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let generator = Arc::new(Scripted(Mutex::new(VecDeque::from([
//!     "## Strategy".to_string(),
//!     "## Recruiter feedback".to_string(),
//!     r##"{"missing_info": [], "tailored_resume": "# Tailored"}"##.to_string(),
//!     "Dear hiring team,".to_string(),
//! ]))));
//! let storage = Arc::new(MemoryStorage::new());
//!
//! let graph = full_pipeline(generator, storage, GenerationConfig::default())
//!     .compile()
//!     .unwrap();
//!
//! let state = PipelineState::builder("alice", "acme-1")
//!     .with_job_description("Senior backend engineer")
//!     .with_original_resume("# Resume")
//!     .with_full_resume("# Full resume")
//!     .build();
//!
//! match graph.run(state).await {
//!     RunResult::Completed(state) => {
//!         assert_eq!(state.cover_letter.as_deref(), Some("Dear hiring team,"));
//!     }
//!     other => panic!("unexpected result: {other:?}"),
//! }
//! # }
//! ```
//!
//! ## Suspension and Resumption
//!
//! When the tailoring stage reports missing information, `run` returns
//! [`graph::RunResult::Suspended`] with an [`interrupt::InterruptPayload`].
//! Drive the built-in conversation with [`runner::PipelineRunner`], or
//! collect out-of-band and call `resume_run` with an
//! [`interrupt::ResumeValue`].

pub mod collect;
pub mod event;
pub mod generator;
pub mod graph;
pub mod interrupt;
pub mod message;
pub mod runner;
pub mod stage;
pub mod stages;
pub mod state;
pub mod storage;
pub mod telemetry;
