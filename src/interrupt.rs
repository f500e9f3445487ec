//! Suspension payloads exchanged between the pipeline and its caller.
//!
//! When the tailoring stage detects missing information it does not throw;
//! it returns a suspension carrying an [`InterruptPayload`]. The caller (or
//! the built-in info-collection sub-pipeline) gathers the answers and feeds
//! a [`ResumeValue`] back into the run.

use serde::{Deserialize, Serialize};

/// Everything a caller needs to collect the missing information out-of-band.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterruptPayload {
    /// The specific items the tailoring stage could not fill in.
    pub missing_info: Vec<String>,
    /// Best-effort draft produced despite the gaps.
    pub tailored_resume: Option<String>,
    pub user_id: String,
    pub job_id: String,
    /// The comprehensive career document, when one was available.
    pub full_resume: Option<String>,
}

/// Data injected into the state when a suspended run resumes.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumeValue {
    /// Prose summary of the gathered information.
    pub collected_info: String,
    /// Full resume with the new information merged in, if the collection
    /// produced one.
    pub updated_full_resume: Option<String>,
}
