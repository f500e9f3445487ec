//! Interactive collection of missing resume information.
//!
//! A suspended run hands its [`InterruptPayload`] to an [`InfoCollection`],
//! which drives a small conversation state machine: introduce the gaps, ask
//! follow-up questions turn by turn, and on termination summarize the answers
//! and merge them into the user's full resume. The caller owns the transport;
//! this module only decides what to say next.

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;

use crate::generator::{GenerationConfig, GenerationError, Generator, generate_with_timeout};
use crate::interrupt::{InterruptPayload, ResumeValue};
use crate::message::Turn;
use crate::storage::{Field, StorageAdapter, StorageError};

/// Phrases that end the conversation when they appear anywhere in a user
/// message, case-insensitively.
pub const TERMINATION_PHRASES: [&str; 4] = ["done", "finished", "that's all", "complete"];

/// Marker the follow-up prompt asks the model to emit once every gap has
/// been covered, so the conversation can end without the user saying so.
const COMPLETION_SENTINEL: &str = "[COLLECTION_COMPLETE]";

/// Where the conversation currently stands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// `begin` has not been called yet.
    AwaitingFirstTurn,
    InConversation,
    Complete,
}

/// Errors raised while collecting information.
#[derive(Debug, Error, Diagnostic)]
pub enum CollectError {
    /// A turn arrived after the conversation already completed.
    #[error("info collection conversation is already complete")]
    #[diagnostic(
        code(tailorgraph::collect::already_complete),
        help("Resume the suspended run with the CollectionResult instead of sending more turns.")
    )]
    AlreadyComplete,

    #[error(transparent)]
    #[diagnostic(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Storage(#[from] StorageError),
}

/// Outcome of the conversation, fed back into the suspended run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionResult {
    pub final_collected_info: String,
    pub updated_full_resume: Option<String>,
}

impl From<CollectionResult> for ResumeValue {
    fn from(result: CollectionResult) -> Self {
        Self {
            collected_info: result.final_collected_info,
            updated_full_resume: result.updated_full_resume,
        }
    }
}

/// What to do after processing a user turn.
#[derive(Clone, Debug)]
pub enum TurnOutcome {
    /// Show this reply to the user and wait for their next message.
    Reply(Turn),
    /// The conversation is over; resume the run with this result.
    Complete(CollectionResult),
}

/// Conversation state machine for one suspension.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InfoCollection {
    missing_info: Vec<String>,
    user_id: String,
    full_resume: Option<String>,
    messages: Vec<Turn>,
    phase: Phase,
}

impl InfoCollection {
    /// Builds a collector from a suspension payload.
    #[must_use]
    pub fn from_interrupt(payload: &InterruptPayload) -> Self {
        Self {
            missing_info: payload.missing_info.clone(),
            user_id: payload.user_id.clone(),
            full_resume: payload.full_resume.clone(),
            messages: Vec::new(),
            phase: Phase::AwaitingFirstTurn,
        }
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Conversation so far, oldest first.
    #[must_use]
    pub fn messages(&self) -> &[Turn] {
        &self.messages
    }

    /// Opens the conversation with a templated introduction enumerating the
    /// gaps. Returns `None` if the conversation already started.
    pub fn begin(&mut self) -> Option<Turn> {
        if self.phase != Phase::AwaitingFirstTurn {
            return None;
        }
        let listing = if self.missing_info.is_empty() {
            "additional resume information".to_string()
        } else {
            self.missing_info.join(", ")
        };
        let first = self
            .missing_info
            .first()
            .map_or("your experience", String::as_str);
        let intro = Turn::assistant(&format!(
            "Hi! I'm here to help gather some missing information for your resume.\n\
             \n\
             I need to collect the following:\n\
             {listing}\n\
             \n\
             Let's start with the first item. Can you tell me about: {first}?"
        ));
        self.messages.push(intro.clone());
        self.phase = Phase::InConversation;
        Some(intro)
    }

    /// Feeds one user message into the conversation.
    ///
    /// Ordinary messages get a follow-up question. A message containing a
    /// termination phrase (or a model reply carrying the completion sentinel)
    /// finishes the collection: the answers are summarized, merged into the
    /// full resume, and the merged resume persisted user-scoped.
    #[instrument(skip_all, fields(user_id = %self.user_id), err)]
    pub async fn user_turn(
        &mut self,
        message: &str,
        generator: &dyn Generator,
        storage: &dyn StorageAdapter,
        config: &GenerationConfig,
    ) -> Result<TurnOutcome, CollectError> {
        if self.phase == Phase::Complete {
            return Err(CollectError::AlreadyComplete);
        }
        if self.phase == Phase::AwaitingFirstTurn {
            self.begin();
        }
        self.messages.push(Turn::user(message));

        if is_termination(message) {
            let result = self.finish(generator, storage, config).await?;
            return Ok(TurnOutcome::Complete(result));
        }

        let reply = generate_with_timeout(generator, &self.follow_up_prompt(), config).await?;

        if reply.contains(COMPLETION_SENTINEL) {
            let cleaned = reply.replace(COMPLETION_SENTINEL, "");
            let cleaned = cleaned.trim();
            if !cleaned.is_empty() {
                self.messages.push(Turn::assistant(cleaned));
            }
            let result = self.finish(generator, storage, config).await?;
            return Ok(TurnOutcome::Complete(result));
        }

        let turn = Turn::assistant(&reply);
        self.messages.push(turn.clone());
        Ok(TurnOutcome::Reply(turn))
    }

    fn follow_up_prompt(&self) -> String {
        let transcript = self
            .messages
            .iter()
            .map(|turn| format!("{}: {}", turn.role, turn.content))
            .collect::<Vec<_>>()
            .join("\n");
        format!(
            "You are a helpful assistant collecting missing resume information. You need \
             to gather:\n\
             {}\n\
             \n\
             Based on the conversation so far, ask relevant follow-up questions to \
             collect the missing information. Be conversational and helpful. If the user \
             has provided some information, acknowledge it and ask for the next piece.\n\
             \n\
             Keep responses brief and focused on collecting the specific information \
             needed. Once every item has been covered, reply with {COMPLETION_SENTINEL} \
             and nothing else.\n\
             \n\
             CONVERSATION:\n\
             {transcript}\n",
            self.missing_info.join(", ")
        )
    }

    fn summary_prompt(&self) -> String {
        let transcript = self
            .messages
            .iter()
            .filter(|turn| turn.is_user())
            .map(|turn| turn.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        format!(
            "Summarize the information the user provided in the conversation below into \
             concise prose a resume writer can work from. Cover each requested item; \
             note explicitly when an item was not answered. Do not invent details.\n\
             \n\
             REQUESTED_ITEMS:\n\
             {}\n\
             \n\
             USER_RESPONSES:\n\
             {transcript}\n",
            self.missing_info.join(", ")
        )
    }

    fn merge_prompt(&self, current_resume: &str, collected_info: &str) -> String {
        format!(
            "Update this resume by incorporating the newly collected information.\n\
             \n\
             INSTRUCTIONS:\n\
             1. Integrate the new information into the appropriate sections\n\
             2. Maintain the existing structure and formatting\n\
             3. Avoid duplication - merge similar information intelligently\n\
             4. Preserve all existing good content\n\
             5. Ensure consistency in style and tone\n\
             \n\
             CURRENT RESUME:\n\
             {current_resume}\n\
             \n\
             NEWLY COLLECTED INFORMATION:\n\
             {collected_info}\n\
             \n\
             Return the complete updated resume.\n"
        )
    }

    /// Summarize, merge, persist.
    async fn finish(
        &mut self,
        generator: &dyn Generator,
        storage: &dyn StorageAdapter,
        config: &GenerationConfig,
    ) -> Result<CollectionResult, CollectError> {
        self.phase = Phase::Complete;

        let has_answers = self.messages.iter().any(|turn| turn.is_user());
        let final_collected_info = if has_answers {
            generate_with_timeout(generator, &self.summary_prompt(), config).await?
        } else {
            "No information collected".to_string()
        };

        let updated_full_resume = match (&self.full_resume, has_answers) {
            (Some(current), true) => {
                let merged = generate_with_timeout(
                    generator,
                    &self.merge_prompt(current, &final_collected_info),
                    config,
                )
                .await?;
                storage
                    .put(&self.user_id, None, Field::FullResume, &merged)
                    .await?;
                tracing::debug!(chars = merged.len(), "full resume updated with collected info");
                Some(merged)
            }
            _ => None,
        };

        self.messages.push(Turn::assistant(
            "Thank you! I've collected all the information. Your resume will be updated shortly.",
        ));

        Ok(CollectionResult {
            final_collected_info,
            updated_full_resume,
        })
    }
}

/// A user message ends the conversation when it contains any termination
/// phrase, case-insensitively, anywhere in the text.
#[must_use]
pub fn is_termination(message: &str) -> bool {
    let lowered = message.to_lowercase();
    TERMINATION_PHRASES
        .iter()
        .any(|phrase| lowered.contains(phrase))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(missing: &[&str]) -> InterruptPayload {
        InterruptPayload {
            missing_info: missing.iter().map(|s| (*s).to_string()).collect(),
            tailored_resume: Some("# Draft".into()),
            user_id: "alice".into(),
            job_id: "acme-1".into(),
            full_resume: Some("# Full resume".into()),
        }
    }

    #[test]
    fn begin_enumerates_the_gaps() {
        let mut collector = InfoCollection::from_interrupt(&payload(&[
            "Kubernetes production experience",
            "team size led",
        ]));
        let intro = collector.begin().unwrap();
        assert!(intro.content.contains("Kubernetes production experience, team size led"));
        assert!(intro.content.contains("Can you tell me about: Kubernetes production experience?"));
        assert_eq!(collector.phase(), Phase::InConversation);
    }

    #[test]
    fn begin_is_idempotent() {
        let mut collector = InfoCollection::from_interrupt(&payload(&["x"]));
        assert!(collector.begin().is_some());
        assert!(collector.begin().is_none());
        assert_eq!(collector.messages().len(), 1);
    }

    #[test]
    fn termination_is_case_insensitive_substring() {
        assert!(is_termination("I'm DONE now"));
        assert!(is_termination("that's all from me"));
        assert!(is_termination("ok, Finished."));
        assert!(is_termination("the list is complete"));
        assert!(!is_termination("I led a team of five"));
    }
}
