//! The built-in stages and canonical pipeline assemblies.

mod cover_letter;
mod initialize;
mod job_analyzer;
mod resume_screener;
mod resume_tailorer;

pub use cover_letter::CoverLetter;
pub use initialize::Initialize;
pub use job_analyzer::JobAnalyzer;
pub use resume_screener::ResumeScreener;
pub use resume_tailorer::ResumeTailorer;

use std::sync::Arc;

use crate::generator::{GenerationConfig, Generator};
use crate::graph::PipelineBuilder;
use crate::stage::StageKind;
use crate::storage::StorageAdapter;

/// Builder pre-populated with the tailoring pipeline:
/// initialize → analyze → screen → tailor.
#[must_use]
pub fn tailoring_pipeline(
    generator: Arc<dyn Generator>,
    storage: Arc<dyn StorageAdapter>,
    config: GenerationConfig,
) -> PipelineBuilder {
    PipelineBuilder::new()
        .add_stage(StageKind::Initialize, Arc::new(Initialize::new(storage.clone())))
        .add_stage(
            StageKind::JobAnalyzer,
            Arc::new(JobAnalyzer::new(
                generator.clone(),
                storage.clone(),
                config.clone(),
            )),
        )
        .add_stage(
            StageKind::ResumeScreener,
            Arc::new(ResumeScreener::new(
                generator.clone(),
                storage.clone(),
                config.clone(),
            )),
        )
        .add_stage(
            StageKind::ResumeTailorer,
            Arc::new(ResumeTailorer::new(generator, storage, config)),
        )
}

/// The full pipeline: tailoring plus cover-letter generation.
#[must_use]
pub fn full_pipeline(
    generator: Arc<dyn Generator>,
    storage: Arc<dyn StorageAdapter>,
    config: GenerationConfig,
) -> PipelineBuilder {
    tailoring_pipeline(generator.clone(), storage.clone(), config.clone()).add_stage(
        StageKind::CoverLetter,
        Arc::new(CoverLetter::new(generator, storage, config)),
    )
}
