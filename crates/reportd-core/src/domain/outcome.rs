//! Outcomes returned to callers of the scheduler and the service control.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Exit status of a daemon that drained after SIGTERM (128 + 15).
pub const TERMINATED_EXIT_CODE: u8 = 143;

/// What `Scheduler::post` decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostOutcome {
    /// Every artifact exists; the producer was dropped.
    Skipped,
    /// An attempt is already in flight; the producer was dropped.
    InProgress,
    /// First attempt for the key was submitted.
    Queued,
    /// A failed or inconsistent key was resubmitted.
    Requeued,
}

impl PostOutcome {
    /// Did this call submit a new attempt?
    pub fn submitted(self) -> bool {
        matches!(self, PostOutcome::Queued | PostOutcome::Requeued)
    }
}

/// Lifecycle of the supervisor.
///
/// Stopped -> Starting -> Running -> Draining -> Stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceState {
    Stopped,
    Starting,
    Running,
    Draining,
}

/// Result of probing the service record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ServiceStatus {
    Running { pid: i32, pgid: Option<i32> },
    NotRunning,
}

/// Who receives SIGTERM on stop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopScope {
    /// Only the recorded process.
    #[default]
    Process,
    /// The recorded process group, so children spawned by producers stop too.
    Group,
}

/// Closed outcome set of `stop`, suitable for exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopOutcome {
    Success,
    Fail,
    NotRunning,
}

impl StopOutcome {
    pub fn exit_code(self) -> u8 {
        match self {
            StopOutcome::Success => 0,
            StopOutcome::Fail => 1,
            StopOutcome::NotRunning => 2,
        }
    }
}

impl fmt::Display for StopOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StopOutcome::Success => "success",
            StopOutcome::Fail => "fail",
            StopOutcome::NotRunning => "not_running",
        };
        f.write_str(s)
    }
}
