//! MemoryEventSink - keeps every event for later inspection.

use std::path::Path;
use std::sync::{Mutex, PoisonError};

use crate::domain::{JobEvent, StatusTag};
use crate::ports::EventSink;

#[derive(Debug, Default)]
pub struct MemoryEventSink {
    events: Mutex<Vec<JobEvent>>,
}

impl MemoryEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<JobEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Status tags emitted for `key`, in emission order.
    pub fn tags_for(&self, key: &Path) -> Vec<StatusTag> {
        self.events()
            .iter()
            .filter(|event| event.key() == key)
            .filter_map(JobEvent::tag)
            .collect()
    }
}

impl EventSink for MemoryEventSink {
    fn emit(&self, event: &JobEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
    }
}
