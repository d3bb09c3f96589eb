//! Regenerator port - 呼び出し側が提供する再生成処理
//!
//! The supervisor calls `regenerate` once per elapsed interval. The callback
//! decides which artifacts should exist and posts them to the scheduler; the
//! core treats it as an opaque side effect.

use std::path::Path;

use async_trait::async_trait;

use crate::app::Scheduler;
use crate::domain::RegenerateError;

#[async_trait]
pub trait Regenerator: Send + Sync {
    async fn regenerate(&self, workdir: &Path, scheduler: &Scheduler)
    -> Result<(), RegenerateError>;
}
