//! Events - lifecycle events emitted by the scheduler.
//!
//! The scheduler never prints. It hands every transition to an
//! [`EventSink`](crate::ports::EventSink), which turns it into status lines.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::ids::AttemptId;

/// Fixed vocabulary of status lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusTag {
    /// Every artifact already exists.
    Skip,
    /// First submission for a key.
    Queue,
    /// An attempt is already queued or running.
    Working,
    /// Resubmission after a failed attempt.
    Requeue,
    /// Resubmission after an inconsistent success.
    Restart,
    /// A worker picked the attempt up.
    Start,
    /// The attempt produced every artifact.
    Create,
    /// The attempt failed.
    Fail,
}

impl StatusTag {
    pub fn as_str(self) -> &'static str {
        match self {
            StatusTag::Skip => "skip",
            StatusTag::Queue => "queue",
            StatusTag::Working => "working",
            StatusTag::Requeue => "requeue",
            StatusTag::Restart => "restart",
            StatusTag::Start => "start",
            StatusTag::Create => "create",
            StatusTag::Fail => "fail",
        }
    }

    pub fn severity(self) -> Severity {
        match self {
            StatusTag::Skip
            | StatusTag::Queue
            | StatusTag::Working
            | StatusTag::Start
            | StatusTag::Create => Severity::Info,
            StatusTag::Requeue | StatusTag::Restart => Severity::Warn,
            StatusTag::Fail => Severity::Error,
        }
    }
}

impl fmt::Display for StatusTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warn,
    Error,
}

/// JobEvent はスケジューラで発生したイベント
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum JobEvent {
    /// A state transition, rendered as one status line.
    Status {
        tag: StatusTag,
        key: PathBuf,
        #[serde(skip_serializing_if = "Option::is_none")]
        attempt: Option<AttemptId>,
    },

    /// The ledger says Succeeded but the artifacts are gone.
    Inconsistent { key: PathBuf },

    /// The producer reported success but these artifacts do not exist.
    MissingArtifacts {
        key: PathBuf,
        attempt: AttemptId,
        missing: Vec<PathBuf>,
    },

    /// The producer returned an error or panicked.
    ProducerFailed {
        key: PathBuf,
        attempt: AttemptId,
        reason: String,
    },
}

impl JobEvent {
    pub fn status(tag: StatusTag, key: impl Into<PathBuf>, attempt: Option<AttemptId>) -> Self {
        JobEvent::Status {
            tag,
            key: key.into(),
            attempt,
        }
    }

    pub fn key(&self) -> &Path {
        match self {
            JobEvent::Status { key, .. }
            | JobEvent::Inconsistent { key }
            | JobEvent::MissingArtifacts { key, .. }
            | JobEvent::ProducerFailed { key, .. } => key,
        }
    }

    pub fn tag(&self) -> Option<StatusTag> {
        match self {
            JobEvent::Status { tag, .. } => Some(*tag),
            _ => None,
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            JobEvent::Status { tag, .. } => tag.severity(),
            JobEvent::Inconsistent { .. } | JobEvent::MissingArtifacts { .. } => Severity::Warn,
            JobEvent::ProducerFailed { .. } => Severity::Error,
        }
    }
}
