//! EventSink port - イベント記録の抽象化
//!
//! Sinks are called from the control thread and from worker threads, so they
//! must be cheap and must not block on the scheduler.

use crate::domain::JobEvent;

pub trait EventSink: Send + Sync {
    fn emit(&self, event: &JobEvent);
}
