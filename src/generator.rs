//! Text-generation seam.
//!
//! Every stage talks to its language model through [`Generator`], a single
//! prompt-in/text-out trait. Concrete backends (hosted APIs, local models,
//! scripted doubles in tests) live behind it; the pipeline never names a
//! provider.

use std::time::Duration;

use async_trait::async_trait;
use miette::Diagnostic;
use rustc_hash::FxHashMap;
use thiserror::Error;

/// Default per-call timeout applied when the caller does not override it.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Per-call generation options.
#[derive(Clone, Debug)]
pub struct GenerationConfig {
    /// Upper bound on a single generation call.
    pub timeout: Duration,
    /// Free-form key/value hints forwarded to the backend (model name,
    /// temperature, and the like). Backends ignore keys they do not know.
    pub metadata: FxHashMap<String, String>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            metadata: FxHashMap::default(),
        }
    }
}

impl GenerationConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Errors surfaced by a generation backend.
#[derive(Debug, Error, Diagnostic)]
pub enum GenerationError {
    /// The backend reported a failure of its own.
    #[error("generation backend error: {message}")]
    #[diagnostic(
        code(tailorgraph::generator::provider),
        help("Check backend credentials and availability, then retry the run.")
    )]
    Provider { message: String },

    /// The call did not complete within the configured timeout.
    #[error("generation timed out after {after:?}")]
    #[diagnostic(
        code(tailorgraph::generator::timeout),
        help("Raise GenerationConfig::timeout or reduce the prompt size.")
    )]
    Timeout { after: Duration },
}

/// Prompt-in, text-out generation backend.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Produces a completion for `prompt`.
    ///
    /// Implementations should honor `config.timeout` where the underlying
    /// client supports it; [`generate_with_timeout`] enforces it externally
    /// for those that do not.
    async fn generate(
        &self,
        prompt: &str,
        config: &GenerationConfig,
    ) -> Result<String, GenerationError>;
}

/// Runs a generation call under the config's timeout.
pub async fn generate_with_timeout(
    generator: &dyn Generator,
    prompt: &str,
    config: &GenerationConfig,
) -> Result<String, GenerationError> {
    match tokio::time::timeout(config.timeout, generator.generate(prompt, config)).await {
        Ok(result) => result,
        Err(_) => Err(GenerationError::Timeout {
            after: config.timeout,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SlowGenerator;

    #[async_trait]
    impl Generator for SlowGenerator {
        async fn generate(
            &self,
            _prompt: &str,
            _config: &GenerationConfig,
        ) -> Result<String, GenerationError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok("too late".into())
        }
    }

    #[tokio::test]
    async fn timeout_is_enforced() {
        let config = GenerationConfig::new().with_timeout(Duration::from_millis(10));
        let result = generate_with_timeout(&SlowGenerator, "prompt", &config).await;
        assert!(matches!(result, Err(GenerationError::Timeout { .. })));
    }

    #[test]
    fn default_timeout_is_two_minutes() {
        assert_eq!(GenerationConfig::default().timeout, DEFAULT_TIMEOUT);
    }
}
