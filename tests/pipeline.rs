//! End-to-end pipeline runs against in-memory storage and a scripted
//! generator.

mod common;

use common::{
    FailingGenerator, ScriptedGenerator, FULL_RESUME, JOB_DESCRIPTION, ORIGINAL_RESUME,
    seeded_storage, tailor_json_complete, tailor_json_with_gaps,
};
use std::sync::Arc;

use tailorgraph::event::{EventEmitter, PipelineEvent};
use tailorgraph::generator::GenerationConfig;
use tailorgraph::graph::RunResult;
use tailorgraph::stages::{full_pipeline, tailoring_pipeline};
use tailorgraph::state::PipelineState;
use tailorgraph::storage::{Field, MemoryStorage, StorageAdapter};

#[tokio::test]
async fn full_pipeline_completes_and_persists_outputs() {
    let generator = ScriptedGenerator::new([
        "## Strategy: wants Rust depth".to_string(),
        "## Feedback: solid, light on leadership".to_string(),
        tailor_json_complete("# Jane Doe, tailored"),
        "Dear hiring team, ...".to_string(),
    ]);
    let storage = seeded_storage("jane", "acme-1").await;

    let graph = full_pipeline(
        generator.clone(),
        storage.clone(),
        GenerationConfig::default(),
    )
    .compile()
    .unwrap();

    let result = graph.run(PipelineState::new("jane", "acme-1")).await;
    let state = match result {
        RunResult::Completed(state) => state,
        other => panic!("expected completion, got {other:?}"),
    };

    // Documents were loaded eagerly.
    assert_eq!(state.job_description.as_deref(), Some(JOB_DESCRIPTION));
    assert_eq!(state.original_resume.as_deref(), Some(ORIGINAL_RESUME));
    assert_eq!(state.full_resume.as_deref(), Some(FULL_RESUME));

    // Every stage output landed on the state.
    assert_eq!(
        state.job_strategy.as_deref(),
        Some("## Strategy: wants Rust depth")
    );
    assert_eq!(
        state.recruiter_feedback.as_deref(),
        Some("## Feedback: solid, light on leadership")
    );
    assert_eq!(state.tailored_resume.as_deref(), Some("# Jane Doe, tailored"));
    assert_eq!(state.cover_letter.as_deref(), Some("Dear hiring team, ..."));
    assert!(state.missing_info.is_empty());
    assert!(state.error.is_none());

    // ...and was persisted as it was produced.
    for field in [
        Field::JobStrategy,
        Field::RecruiterFeedback,
        Field::TailoredResume,
        Field::CoverLetter,
    ] {
        assert!(
            storage
                .get("jane", Some("acme-1"), field)
                .await
                .unwrap()
                .is_some(),
            "{field} was not persisted"
        );
    }
}

#[tokio::test]
async fn prompts_carry_the_upstream_documents() {
    let generator = ScriptedGenerator::new([
        "strategy".to_string(),
        "feedback".to_string(),
        tailor_json_complete("tailored"),
        "letter".to_string(),
    ]);
    let storage = seeded_storage("jane", "acme-1").await;
    let graph = full_pipeline(
        generator.clone(),
        storage,
        GenerationConfig::default(),
    )
    .compile()
    .unwrap();

    graph.run(PipelineState::new("jane", "acme-1")).await;

    let prompts = generator.prompts();
    assert_eq!(prompts.len(), 4);
    assert!(prompts[0].contains(JOB_DESCRIPTION));
    assert!(prompts[1].contains("strategy"));
    assert!(prompts[1].contains(ORIGINAL_RESUME));
    assert!(prompts[2].contains("feedback"));
    assert!(prompts[2].contains(FULL_RESUME));
    assert!(prompts[3].contains("tailored"));
}

#[tokio::test]
async fn generation_failure_fails_fast() {
    let storage = seeded_storage("jane", "acme-1").await;
    let graph = full_pipeline(
        Arc::new(FailingGenerator),
        storage.clone(),
        GenerationConfig::default(),
    )
    .compile()
    .unwrap();

    let result = graph.run(PipelineState::new("jane", "acme-1")).await;
    let failure = match result {
        RunResult::Failed(failure) => failure,
        other => panic!("expected failure, got {other:?}"),
    };

    assert_eq!(failure.stage.as_str(), "job_analyzer");
    assert!(failure.message.contains("backend unavailable"));
    assert_eq!(failure.state.error.as_deref(), Some(failure.message.as_str()));
    // Nothing downstream ran or persisted.
    assert!(failure.state.recruiter_feedback.is_none());
    assert!(
        storage
            .get("jane", Some("acme-1"), Field::JobStrategy)
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn missing_documents_fail_initialize() {
    let generator = ScriptedGenerator::new(Vec::<String>::new());
    let storage = Arc::new(MemoryStorage::new());
    let graph = full_pipeline(generator.clone(), storage, GenerationConfig::default())
        .compile()
        .unwrap();

    let result = graph.run(PipelineState::new("nobody", "acme-1")).await;
    let failure = match result {
        RunResult::Failed(failure) => failure,
        other => panic!("expected failure, got {other:?}"),
    };
    assert_eq!(failure.stage.as_str(), "initialize");
    assert!(failure.message.contains("job_description"));
    assert_eq!(generator.calls(), 0);
}

#[tokio::test]
async fn tailoring_gaps_suspend_the_run() {
    let generator = ScriptedGenerator::new([
        "strategy".to_string(),
        "feedback".to_string(),
        tailor_json_with_gaps("# Draft", &["Kubernetes experience", "team size"]),
    ]);
    let storage = seeded_storage("jane", "acme-1").await;
    let graph = full_pipeline(generator, storage.clone(), GenerationConfig::default())
        .compile()
        .unwrap();

    let result = graph.run(PipelineState::new("jane", "acme-1")).await;
    let interrupted = match result {
        RunResult::Suspended(interrupted) => interrupted,
        other => panic!("expected suspension, got {other:?}"),
    };

    assert_eq!(interrupted.stage.as_str(), "resume_tailorer");
    assert_eq!(
        interrupted.payload.missing_info,
        vec!["Kubernetes experience", "team size"]
    );
    assert_eq!(interrupted.payload.tailored_resume.as_deref(), Some("# Draft"));
    assert_eq!(interrupted.payload.user_id, "jane");
    assert_eq!(interrupted.payload.job_id, "acme-1");
    assert_eq!(interrupted.payload.full_resume.as_deref(), Some(FULL_RESUME));
    assert_eq!(
        interrupted.state.missing_info,
        vec!["Kubernetes experience", "team size"]
    );
    // The cover letter never ran.
    assert!(interrupted.state.cover_letter.is_none());

    // The draft was still persisted for inspection.
    assert_eq!(
        storage
            .get("jane", Some("acme-1"), Field::TailoredResume)
            .await
            .unwrap()
            .as_deref(),
        Some("# Draft")
    );
}

#[tokio::test]
async fn tailoring_pipeline_stops_before_cover_letter() {
    let generator = ScriptedGenerator::new([
        "strategy".to_string(),
        "feedback".to_string(),
        tailor_json_complete("tailored"),
    ]);
    let storage = seeded_storage("jane", "acme-1").await;
    let graph = tailoring_pipeline(generator.clone(), storage, GenerationConfig::default())
        .compile()
        .unwrap();

    let result = graph.run(PipelineState::new("jane", "acme-1")).await;
    let state = match result {
        RunResult::Completed(state) => state,
        other => panic!("expected completion, got {other:?}"),
    };
    assert_eq!(state.tailored_resume.as_deref(), Some("tailored"));
    assert!(state.cover_letter.is_none());
    assert_eq!(generator.calls(), 3);
}

#[tokio::test]
async fn thin_resume_suspends_but_rich_full_resume_does_not() {
    // A frontend resume against a backend-leadership posting: the tailorer
    // reports the gaps and the run suspends.
    let generator = ScriptedGenerator::new([
        "strategy".to_string(),
        "feedback".to_string(),
        tailor_json_with_gaps(
            "# Draft",
            &["backend development experience", "team leadership evidence"],
        ),
    ]);
    let storage = Arc::new(MemoryStorage::new());
    storage
        .put(
            "sam",
            Some("j1"),
            Field::JobDescription,
            "Backend engineer, Python, leadership",
        )
        .await
        .unwrap();
    storage
        .put("sam", None, Field::OriginalResume, "Frontend dev, 3 yrs")
        .await
        .unwrap();
    let graph = full_pipeline(generator, storage.clone(), GenerationConfig::default())
        .compile()
        .unwrap();

    let result = graph.run(PipelineState::new("sam", "j1")).await;
    let RunResult::Suspended(interrupted) = result else {
        panic!("thin resume should suspend");
    };
    assert!(
        interrupted
            .payload
            .missing_info
            .iter()
            .any(|item| item.contains("backend") || item.contains("leadership"))
    );

    // Same posting, but the full resume already covers the gaps: no suspend,
    // and the evidence lands in the tailored resume.
    let generator = ScriptedGenerator::new([
        "strategy".to_string(),
        "feedback".to_string(),
        tailor_json_complete("Led 5-engineer backend team using Python and Django"),
        "letter".to_string(),
    ]);
    storage
        .put(
            "sam",
            None,
            Field::FullResume,
            "Led 5-engineer backend team using Python and Django",
        )
        .await
        .unwrap();
    let graph = full_pipeline(generator, storage, GenerationConfig::default())
        .compile()
        .unwrap();

    let result = graph.run(PipelineState::new("sam", "j1")).await;
    let RunResult::Completed(state) = result else {
        panic!("rich full resume should not suspend");
    };
    assert!(state.missing_info.is_empty());
    assert!(
        state
            .tailored_resume
            .as_deref()
            .unwrap()
            .contains("Led 5-engineer backend team")
    );
}

#[tokio::test]
async fn events_trace_the_run_including_suspension() {
    let generator = ScriptedGenerator::new([
        "strategy".to_string(),
        "feedback".to_string(),
        tailor_json_with_gaps("# Draft", &["team size"]),
    ]);
    let storage = seeded_storage("jane", "acme-1").await;
    let (emitter, receiver) = EventEmitter::channel();
    let graph = full_pipeline(generator, storage, GenerationConfig::default())
        .with_events(emitter)
        .compile()
        .unwrap();

    graph.run(PipelineState::new("jane", "acme-1")).await;

    let events: Vec<PipelineEvent> = receiver.drain().collect();
    let starts: Vec<&str> = events
        .iter()
        .filter_map(|e| match e {
            PipelineEvent::StageStarted { stage } => Some(stage.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(
        starts,
        vec!["initialize", "job_analyzer", "resume_screener", "resume_tailorer"]
    );
    assert!(events.iter().any(|e| matches!(
        e,
        PipelineEvent::Suspended { missing_info, .. } if missing_info == &vec!["team size".to_string()]
    )));
    // The cover letter never started.
    assert!(!starts.contains(&"cover_letter"));
}

#[tokio::test]
async fn restart_reuses_persisted_documents_and_overwrites_outputs() {
    let generator = ScriptedGenerator::new([
        "strategy v1".to_string(),
        "feedback v1".to_string(),
        tailor_json_complete("tailored v1"),
        "letter v1".to_string(),
        "strategy v2".to_string(),
        "feedback v2".to_string(),
        tailor_json_complete("tailored v2"),
        "letter v2".to_string(),
    ]);
    let storage = seeded_storage("jane", "acme-1").await;
    let graph = full_pipeline(generator, storage.clone(), GenerationConfig::default())
        .compile()
        .unwrap();

    let first = graph.run(PipelineState::new("jane", "acme-1")).await;
    assert!(matches!(first, RunResult::Completed(_)));

    // A fresh run for the same job reloads the same inputs and replaces the
    // persisted outputs, last writer wins.
    let second = graph.run(PipelineState::new("jane", "acme-1")).await;
    let state = match second {
        RunResult::Completed(state) => state,
        other => panic!("expected completion, got {other:?}"),
    };
    assert_eq!(state.job_description.as_deref(), Some(JOB_DESCRIPTION));
    assert_eq!(state.tailored_resume.as_deref(), Some("tailored v2"));
    assert_eq!(
        storage
            .get("jane", Some("acme-1"), Field::CoverLetter)
            .await
            .unwrap()
            .as_deref(),
        Some("letter v2")
    );
}

#[tokio::test]
async fn malformed_tailor_output_falls_back_to_raw_text() {
    let generator = ScriptedGenerator::new([
        "strategy".to_string(),
        "feedback".to_string(),
        "# Just a resume, no JSON".to_string(),
        "letter".to_string(),
    ]);
    let storage = seeded_storage("jane", "acme-1").await;
    let graph = full_pipeline(generator, storage, GenerationConfig::default())
        .compile()
        .unwrap();

    let result = graph.run(PipelineState::new("jane", "acme-1")).await;
    let state = match result {
        RunResult::Completed(state) => state,
        other => panic!("expected completion, got {other:?}"),
    };
    assert_eq!(
        state.tailored_resume.as_deref(),
        Some("# Just a resume, no JSON")
    );
}
