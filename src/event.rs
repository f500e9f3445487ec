//! Progress events emitted during a pipeline run.
//!
//! Emission is best-effort over a bounded `flume` channel: a slow or absent
//! consumer never stalls a run, it just loses events.

use flume::{Receiver, Sender, TrySendError};
use serde::{Deserialize, Serialize};

use crate::stage::StageKind;

const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Observable moments in a run's life.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineEvent {
    StageStarted {
        stage: StageKind,
    },
    StageCompleted {
        stage: StageKind,
        updated_fields: Vec<String>,
    },
    StageFailed {
        stage: StageKind,
        message: String,
    },
    /// The run suspended awaiting missing information.
    Suspended {
        stage: StageKind,
        missing_info: Vec<String>,
    },
    /// Free-form diagnostic line from inside a stage.
    Note {
        stage: StageKind,
        message: String,
    },
}

/// Handle stages use to publish [`PipelineEvent`]s.
#[derive(Clone, Debug)]
pub struct EventEmitter {
    sender: Option<Sender<PipelineEvent>>,
}

impl Default for EventEmitter {
    fn default() -> Self {
        Self::disabled()
    }
}

impl EventEmitter {
    /// Emitter that drops everything; the default for runs nobody watches.
    #[must_use]
    pub fn disabled() -> Self {
        Self { sender: None }
    }

    /// Builds an emitter and the receiving end of its channel.
    #[must_use]
    pub fn channel() -> (Self, Receiver<PipelineEvent>) {
        let (sender, receiver) = flume::bounded(DEFAULT_CHANNEL_CAPACITY);
        (
            Self {
                sender: Some(sender),
            },
            receiver,
        )
    }

    /// Publishes an event, dropping it if the channel is full or closed.
    pub fn emit(&self, event: PipelineEvent) {
        if let Some(sender) = &self.sender {
            match sender.try_send(event) {
                Ok(()) | Err(TrySendError::Disconnected(_)) => {}
                Err(TrySendError::Full(_)) => {
                    tracing::debug!("event channel full, dropping pipeline event");
                }
            }
        }
    }
}
