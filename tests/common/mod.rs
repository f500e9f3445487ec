//! Shared fixtures for integration tests: canned generators and seeded
//! storage.

// Each test binary compiles this module separately and uses a subset of it.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tailorgraph::generator::{GenerationConfig, GenerationError, Generator};
use tailorgraph::storage::{Field, MemoryStorage, StorageAdapter};

pub const JOB_DESCRIPTION: &str = "Senior backend engineer. Rust, Postgres, \
    Kubernetes. Leads a team of four.";
pub const ORIGINAL_RESUME: &str = "# Jane Doe\n\nBackend developer, 6 years. \
    Rust and Go services.";
pub const FULL_RESUME: &str = "# Jane Doe (full)\n\nEverything Jane has ever \
    done, including hackathons and talks.";

/// Generator that pops canned responses in order and records every prompt
/// it was given. Errors once the script runs out.
pub struct ScriptedGenerator {
    responses: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn new<I, S>(responses: I) -> Arc<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Arc::new(Self {
            responses: Mutex::new(responses.into_iter().map(Into::into).collect()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    /// Every prompt seen so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    async fn generate(
        &self,
        prompt: &str,
        _config: &GenerationConfig,
    ) -> Result<String, GenerationError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or(GenerationError::Provider {
                message: "script exhausted".into(),
            })
    }
}

/// Generator that always fails, for error-path tests.
pub struct FailingGenerator;

#[async_trait]
impl Generator for FailingGenerator {
    async fn generate(
        &self,
        _prompt: &str,
        _config: &GenerationConfig,
    ) -> Result<String, GenerationError> {
        Err(GenerationError::Provider {
            message: "backend unavailable".into(),
        })
    }
}

/// In-memory storage pre-loaded with Jane's documents for `user`/`job`.
pub async fn seeded_storage(user: &str, job: &str) -> Arc<MemoryStorage> {
    let storage = Arc::new(MemoryStorage::new());
    storage
        .put(user, Some(job), Field::JobDescription, JOB_DESCRIPTION)
        .await
        .unwrap();
    storage
        .put(user, None, Field::OriginalResume, ORIGINAL_RESUME)
        .await
        .unwrap();
    storage
        .put(user, None, Field::FullResume, FULL_RESUME)
        .await
        .unwrap();
    storage
}

/// The canned tailorer answer for runs that should not suspend.
pub fn tailor_json_complete(resume: &str) -> String {
    format!(r#"{{"missing_info": [], "tailored_resume": "{resume}"}}"#)
}

/// The canned tailorer answer for runs that should suspend.
pub fn tailor_json_with_gaps(resume: &str, gaps: &[&str]) -> String {
    let gaps = gaps
        .iter()
        .map(|g| format!("\"{g}\""))
        .collect::<Vec<_>>()
        .join(", ");
    format!(r#"{{"missing_info": [{gaps}], "tailored_resume": "{resume}"}}"#)
}
