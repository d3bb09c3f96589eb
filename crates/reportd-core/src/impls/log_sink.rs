//! TracingEventSink - status lines through `tracing`.
//!
//! ## Example output
//! ```text
//! INFO reportd: queue tag="queue" key="/data/out/a.txt"
//! INFO reportd: start tag="start" key="/data/out/a.txt" attempt=attempt-01J...
//! WARN reportd: artifact missing after successful job key="/data/out/b.txt" path="/data/out/b.txt"
//! ERROR reportd: fail tag="fail" key="/data/out/b.txt" attempt=attempt-01J...
//! ```

use crate::domain::{JobEvent, Severity};
use crate::ports::EventSink;

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

impl TracingEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for TracingEventSink {
    fn emit(&self, event: &JobEvent) {
        match event {
            JobEvent::Status { tag, key, attempt } => {
                let key = key.display();
                let attempt = attempt.map(|a| a.to_string()).unwrap_or_default();
                match tag.severity() {
                    Severity::Info => {
                        tracing::info!(target: "reportd", tag = %tag, key = %key, attempt = %attempt, "{tag}")
                    }
                    Severity::Warn => {
                        tracing::warn!(target: "reportd", tag = %tag, key = %key, attempt = %attempt, "{tag}")
                    }
                    Severity::Error => {
                        tracing::error!(target: "reportd", tag = %tag, key = %key, attempt = %attempt, "{tag}")
                    }
                }
            }
            JobEvent::Inconsistent { key } => {
                tracing::warn!(
                    target: "reportd",
                    key = %key.display(),
                    "artifact does not exist but job status is 'success'"
                );
            }
            JobEvent::MissingArtifacts {
                key,
                attempt,
                missing,
            } => {
                for path in missing {
                    tracing::warn!(
                        target: "reportd",
                        key = %key.display(),
                        attempt = %attempt,
                        path = %path.display(),
                        "artifact missing after successful job"
                    );
                }
            }
            JobEvent::ProducerFailed {
                key,
                attempt,
                reason,
            } => {
                tracing::error!(
                    target: "reportd",
                    key = %key.display(),
                    attempt = %attempt,
                    error = %reason,
                    "producer failed"
                );
            }
        }
    }
}
