//! TaskHandle - completion flag + await primitive for one attempt.

use tokio::sync::watch;

use crate::domain::{AttemptId, TaskState};

/// Observes the state of one attempt.
///
/// Backed by a watch channel whose value *is* the ledger state, so a handle
/// can never see completion before the ledger does.
#[derive(Debug, Clone)]
pub struct TaskHandle {
    attempt: AttemptId,
    state: watch::Receiver<TaskState>,
}

impl TaskHandle {
    pub(crate) fn new(attempt: AttemptId, state: watch::Receiver<TaskState>) -> Self {
        Self { attempt, state }
    }

    pub fn attempt(&self) -> AttemptId {
        self.attempt
    }

    pub fn state(&self) -> TaskState {
        *self.state.borrow()
    }

    pub fn is_finished(&self) -> bool {
        self.state().is_terminal()
    }

    /// Wait until the attempt reaches Succeeded or Failed.
    pub async fn wait(&self) -> TaskState {
        let mut rx = self.state.clone();
        let finished = rx
            .wait_for(|state| state.is_terminal())
            .await
            .map(|state| *state);
        // sender が消えた（entry が上書きされた）場合は最後の値を返す
        finished.unwrap_or_else(|_| *rx.borrow())
    }
}
