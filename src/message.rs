use serde::{Deserialize, Serialize};

/// A single turn in the info-collection conversation.
///
/// Turns carry a role (typically "user" or "assistant") and text content.
/// They accumulate append-only in [`PipelineState::conversation_history`]
/// (crate::state::PipelineState) while the info-collection sub-pipeline is
/// active.
///
/// # Examples
///
/// ```
/// use tailorgraph::message::Turn;
///
/// let question = Turn::assistant("Can you tell me about your backend experience?");
/// let answer = Turn::user("I maintained a Django service for three years.");
/// assert!(question.has_role(Turn::ASSISTANT));
/// assert!(answer.has_role(Turn::USER));
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Turn {
    /// The role of the sender (e.g., "user", "assistant", "system").
    pub role: String,
    /// The text content of the turn.
    pub content: String,
}

impl Turn {
    /// User input role.
    pub const USER: &'static str = "user";
    /// Assistant response role.
    pub const ASSISTANT: &'static str = "assistant";
    /// System instruction role.
    pub const SYSTEM: &'static str = "system";

    /// Creates a new turn with the specified role and content.
    #[must_use]
    pub fn new(role: &str, content: &str) -> Self {
        Self {
            role: role.to_string(),
            content: content.to_string(),
        }
    }

    /// Creates a user turn.
    #[must_use]
    pub fn user(content: &str) -> Self {
        Self::new(Self::USER, content)
    }

    /// Creates an assistant turn.
    #[must_use]
    pub fn assistant(content: &str) -> Self {
        Self::new(Self::ASSISTANT, content)
    }

    /// Creates a system turn.
    #[must_use]
    pub fn system(content: &str) -> Self {
        Self::new(Self::SYSTEM, content)
    }

    /// Returns true if this turn has the specified role.
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.role == role
    }

    /// Returns true if this turn came from the user.
    #[must_use]
    pub fn is_user(&self) -> bool {
        self.role == Self::USER
    }
}
