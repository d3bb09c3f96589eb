//! Task ledger: key -> state of the latest attempt.
//!
//! Design:
//! - This is the single source of truth for task state within the process.
//! - Entries are never deleted, only overwritten by a resubmission.
//! - Writes carry the attempt id; a write from an attempt that has already
//!   been replaced is ignored (last writer wins).

mod handle;

pub use handle::TaskHandle;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use tokio::sync::watch;

use crate::domain::{AttemptId, TaskKey, TaskState};
use crate::observability::LedgerCounts;

struct LedgerEntry {
    attempt: AttemptId,
    state: watch::Sender<TaskState>,
}

impl LedgerEntry {
    fn handle(&self) -> TaskHandle {
        TaskHandle::new(self.attempt, self.state.subscribe())
    }
}

#[derive(Default)]
pub struct TaskLedger {
    entries: Mutex<HashMap<PathBuf, LedgerEntry>>,
}

impl TaskLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<PathBuf, LedgerEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current state for `key`, or `None` if it was never submitted.
    pub fn status_of(&self, key: &TaskKey) -> Option<TaskState> {
        self.entries()
            .get(key.canonical())
            .map(|entry| *entry.state.borrow())
    }

    /// Install a fresh Queued entry for `attempt`, replacing whatever was there.
    pub fn record_queued(&self, key: &TaskKey, attempt: AttemptId) -> TaskHandle {
        let (state, _) = watch::channel(TaskState::Queued);
        let entry = LedgerEntry { attempt, state };
        let handle = entry.handle();
        self.entries().insert(key.canonical().to_path_buf(), entry);
        handle
    }

    /// Queued -> Running. Returns false if `attempt` is no longer current.
    pub fn mark_running(&self, key: &TaskKey, attempt: AttemptId) -> bool {
        self.transition(key, attempt, TaskState::Running)
    }

    /// Running -> Succeeded | Failed. Returns false if `attempt` is no longer current.
    pub fn record_result(&self, key: &TaskKey, attempt: AttemptId, success: bool) -> bool {
        let state = if success {
            TaskState::Succeeded
        } else {
            TaskState::Failed
        };
        self.transition(key, attempt, state)
    }

    fn transition(&self, key: &TaskKey, attempt: AttemptId, next: TaskState) -> bool {
        let entries = self.entries();
        match entries.get(key.canonical()) {
            Some(entry) if entry.attempt == attempt => {
                // 値の書き込みと通知は同じ操作: handle は書き込み後の値しか見ない
                entry.state.send_replace(next);
                true
            }
            _ => {
                tracing::debug!(key = %key, attempt = %attempt, state = ?next, "stale ledger write ignored");
                false
            }
        }
    }

    /// Handle for the latest attempt of `key`.
    pub fn handle(&self, key: &TaskKey) -> Option<TaskHandle> {
        self.entries().get(key.canonical()).map(LedgerEntry::handle)
    }

    pub fn counts(&self) -> LedgerCounts {
        let mut counts = LedgerCounts::default();
        for entry in self.entries().values() {
            match *entry.state.borrow() {
                TaskState::Queued => counts.queued += 1,
                TaskState::Running => counts.running += 1,
                TaskState::Succeeded => counts.succeeded += 1,
                TaskState::Failed => counts.failed += 1,
            }
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    fn key(path: &str) -> TaskKey {
        TaskKey::single(path).unwrap()
    }

    #[test]
    fn absent_until_queued() {
        let ledger = TaskLedger::new();
        let k = key("/out/a.txt");
        assert_eq!(ledger.status_of(&k), None);

        ledger.record_queued(&k, AttemptId::generate());
        assert_eq!(ledger.status_of(&k), Some(TaskState::Queued));
    }

    #[test]
    fn lifecycle_transitions() {
        let ledger = TaskLedger::new();
        let k = key("/out/a.txt");
        let attempt = AttemptId::generate();
        let handle = ledger.record_queued(&k, attempt);

        assert!(ledger.mark_running(&k, attempt));
        assert_eq!(handle.state(), TaskState::Running);
        assert!(!handle.is_finished());

        assert!(ledger.record_result(&k, attempt, false));
        assert_eq!(ledger.status_of(&k), Some(TaskState::Failed));
        assert!(handle.is_finished());
    }

    #[test]
    fn resubmission_overwrites_and_ignores_stale_writes() {
        let ledger = TaskLedger::new();
        let k = key("/out/a.txt");
        let first = AttemptId::generate();
        ledger.record_queued(&k, first);
        ledger.record_result(&k, first, false);

        let second = AttemptId::generate();
        let handle = ledger.record_queued(&k, second);
        assert_eq!(handle.attempt(), second);
        assert_eq!(ledger.status_of(&k), Some(TaskState::Queued));

        // 古い attempt からの書き込みは無視される
        assert!(!ledger.record_result(&k, first, true));
        assert_eq!(ledger.status_of(&k), Some(TaskState::Queued));
        assert_eq!(ledger.counts().total(), 1);
    }

    #[test]
    fn counts_by_state() {
        let ledger = TaskLedger::new();
        let a = key("/out/a.txt");
        let b = key("/out/b.txt");
        let c = key("/out/c.txt");

        let attempt_a = AttemptId::generate();
        ledger.record_queued(&a, attempt_a);
        ledger.mark_running(&a, attempt_a);
        let attempt_b = AttemptId::generate();
        ledger.record_queued(&b, attempt_b);
        ledger.record_result(&b, attempt_b, true);
        ledger.record_queued(&c, AttemptId::generate());

        let counts = ledger.counts();
        assert_eq!(counts.queued, 1);
        assert_eq!(counts.running, 1);
        assert_eq!(counts.succeeded, 1);
        assert_eq!(counts.failed, 0);
        assert_eq!(counts.in_flight(), 2);
        assert_eq!(counts.total(), 3);
    }

    #[tokio::test]
    async fn handle_wait_resolves_with_terminal_state() {
        let ledger = Arc::new(TaskLedger::new());
        let k = key("/out/a.txt");
        let attempt = AttemptId::generate();
        let handle = ledger.record_queued(&k, attempt);

        let writer = {
            let ledger = Arc::clone(&ledger);
            let k = k.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                ledger.mark_running(&k, attempt);
                ledger.record_result(&k, attempt, true);
            })
        };

        assert_eq!(handle.wait().await, TaskState::Succeeded);
        // handle が完了を見た時点で ledger も既に更新済み
        assert_eq!(ledger.status_of(&k), Some(TaskState::Succeeded));
        writer.await.unwrap();
    }
}
