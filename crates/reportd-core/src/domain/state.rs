//! Task state machine for the ledger.

use serde::{Deserialize, Serialize};

/// State of the latest attempt for a key.
///
/// State transitions:
/// - Queued -> Running -> Succeeded
/// - Queued -> Running -> Failed
/// - Succeeded | Failed -> Queued (resubmission overwrites the entry)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    /// Submitted to the pool, no worker has picked it up yet.
    Queued,

    /// A worker is executing the producer.
    Running,

    /// The producer succeeded and every artifact exists.
    Succeeded,

    /// The producer failed, panicked, or left artifacts missing.
    Failed,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Succeeded | TaskState::Failed)
    }

    /// Queued or Running: a new `post` for the key must not start another attempt.
    pub fn is_in_flight(self) -> bool {
        !self.is_terminal()
    }
}
