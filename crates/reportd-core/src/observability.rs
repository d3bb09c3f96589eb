use serde::{Deserialize, Serialize};

/// Per-state counts over the task ledger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerCounts {
    pub queued: usize,
    pub running: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl LedgerCounts {
    /// Tasks that have not reached a terminal state yet.
    pub fn in_flight(&self) -> usize {
        self.queued + self.running
    }

    pub fn total(&self) -> usize {
        self.in_flight() + self.succeeded + self.failed
    }
}
