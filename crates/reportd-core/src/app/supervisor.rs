//! Supervisor - runs the regeneration loop as a controllable background service.
//!
//! # 状態遷移
//! Stopped -> Starting -> Running -> Draining -> Stopped
//!
//! # フロー
//! 1. `ServiceControl::start`: 既存 daemon の確認 -> detach -> service record 保存
//! 2. runtime を作り SIGTERM ハンドラを登録（token を cancel するだけ）
//! 3. `Supervisor::serve`: interval ごとに regenerate、poll_interval ごとに停止要求を確認
//! 4. 停止要求 -> Draining: scheduler の全タスク完了を待つ -> 自分の record なら削除 -> 143

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

use super::process;
use super::scheduler::Scheduler;
use super::service_record::ServiceRecord;
use super::signals;
use crate::config::SupervisorConfig;
use crate::domain::{
    ServiceError, ServiceState, ServiceStatus, StopOutcome, StopScope, TERMINATED_EXIT_CODE,
};
use crate::impls::TracingEventSink;
use crate::ports::{Clock, EventSink, Regenerator, SystemClock};

/// Is a regeneration cycle due at `now`?
pub fn is_due(
    last_run: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    interval: std::time::Duration,
) -> bool {
    let Some(last_run) = last_run else {
        return true;
    };
    // 時計が巻き戻った場合も実行する
    match (now - last_run).to_std() {
        Ok(elapsed) => elapsed >= interval,
        Err(_) => true,
    }
}

/// Owns the poll loop of one daemon.
pub struct Supervisor<R> {
    workdir: PathBuf,
    config: SupervisorConfig,
    regenerator: R,
    clock: Arc<dyn Clock>,
    events: Arc<dyn EventSink>,
    state: Mutex<ServiceState>,
}

impl<R: Regenerator> Supervisor<R> {
    pub fn new(workdir: impl Into<PathBuf>, regenerator: R, config: SupervisorConfig) -> Self {
        Self {
            workdir: workdir.into(),
            config,
            regenerator,
            clock: Arc::new(SystemClock),
            events: Arc::new(TracingEventSink::new()),
            state: Mutex::new(ServiceState::Stopped),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    pub fn state(&self) -> ServiceState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn transition(&self, next: ServiceState) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        tracing::info!(from = ?*state, to = ?next, workdir = %self.workdir.display(), "service state");
        *state = next;
    }

    /// Run the poll loop until `stop` is cancelled, then drain.
    ///
    /// Returns the exit code the process should terminate with. A failed
    /// regeneration cycle is logged and the loop keeps going.
    pub async fn serve(&self, stop: CancellationToken) -> Result<u8, ServiceError> {
        self.transition(ServiceState::Starting);
        let scheduler = Scheduler::builder(self.config.scheduler.clone())
            .events(Arc::clone(&self.events))
            .build()
            .inspect_err(|_| self.transition(ServiceState::Stopped))?;
        self.transition(ServiceState::Running);

        let mut last_run: Option<DateTime<Utc>> = None;
        while !stop.is_cancelled() {
            if is_due(last_run, self.clock.now(), self.config.interval) {
                self.run_cycle(&scheduler).await;
                last_run = Some(self.clock.now());
            }

            tokio::select! {
                _ = stop.cancelled() => {}
                _ = tokio::time::sleep(self.config.poll_interval) => {}
            }
        }

        self.transition(ServiceState::Draining);
        scheduler.wait().await;
        let counts = scheduler.counts();
        tracing::info!(
            succeeded = counts.succeeded,
            failed = counts.failed,
            "all in-flight tasks finished"
        );
        self.transition(ServiceState::Stopped);
        Ok(TERMINATED_EXIT_CODE)
    }

    async fn run_cycle(&self, scheduler: &Scheduler) {
        tracing::debug!(workdir = %self.workdir.display(), "regeneration cycle");
        if let Err(err) = self.regenerator.regenerate(&self.workdir, scheduler).await {
            tracing::warn!(error = %err, workdir = %self.workdir.display(), "regeneration cycle failed");
        }
        let counts = scheduler.counts();
        tracing::info!(
            queued = counts.queued,
            running = counts.running,
            succeeded = counts.succeeded,
            failed = counts.failed,
            "ledger"
        );
    }
}

/// start / status / stop for the daemon of one working directory.
#[derive(Debug, Clone)]
pub struct ServiceControl {
    workdir: PathBuf,
    record_path: PathBuf,
}

impl ServiceControl {
    pub fn new(workdir: impl Into<PathBuf>, service_name: &str) -> Self {
        let workdir = workdir.into();
        let record_path = ServiceRecord::path(&workdir, service_name);
        Self {
            workdir,
            record_path,
        }
    }

    pub fn record_path(&self) -> &Path {
        &self.record_path
    }

    /// Probe the recorded process. A stale record is left in place.
    pub fn status(&self) -> ServiceStatus {
        let record = match ServiceRecord::load(&self.record_path) {
            Ok(Some(record)) => record,
            Ok(None) => return ServiceStatus::NotRunning,
            Err(err) => {
                tracing::warn!(error = %err, "cannot read service record");
                return ServiceStatus::NotRunning;
            }
        };

        if process::is_alive(record.pid) {
            ServiceStatus::Running {
                pid: record.pid,
                pgid: record.pgid,
            }
        } else {
            tracing::debug!(pid = record.pid, path = %self.record_path.display(), "stale service record");
            ServiceStatus::NotRunning
        }
    }

    /// Send SIGTERM to the daemon (or its process group) and remove the record.
    pub fn stop(&self, scope: StopScope) -> StopOutcome {
        let ServiceStatus::Running { pid, pgid } = self.status() else {
            return StopOutcome::NotRunning;
        };

        let result = process::terminate(pid, pgid, scope)
            .and_then(|()| ServiceRecord::remove(&self.record_path));
        match result {
            Ok(()) => {
                tracing::info!(pid, ?scope, "stop requested");
                StopOutcome::Success
            }
            Err(err) => {
                tracing::error!(pid, error = %err, "stop failed");
                StopOutcome::Fail
            }
        }
    }

    /// Daemonize and run the supervisor loop until SIGTERM.
    ///
    /// Returns the exit code for the daemon process. Errors are only returned
    /// before the loop starts.
    pub fn start<R: Regenerator>(
        &self,
        regenerator: R,
        config: SupervisorConfig,
    ) -> Result<u8, ServiceError> {
        config.validate()?;
        if let ServiceStatus::Running { pid, .. } = self.status() {
            return Err(ServiceError::AlreadyRunning { pid });
        }

        tracing::info!(workdir = %self.workdir.display(), "start");
        // fork は runtime を作る前に行う
        process::daemonize()?;
        ServiceRecord::current().store(&self.record_path)?;

        let code = self.serve_until_sigterm(regenerator, config);
        self.release_record(ServiceRecord::current().pid);
        code
    }

    /// Drop the record on exit unless a newer daemon has stored its own.
    fn release_record(&self, pid: i32) {
        match ServiceRecord::release(&self.record_path, pid) {
            Ok(true) => {}
            Ok(false) => {
                tracing::info!(pid, path = %self.record_path.display(), "service record belongs to another process, left in place")
            }
            Err(err) => tracing::warn!(error = %err, "cannot remove service record"),
        }
    }

    /// Same loop as [`start`](Self::start) without detaching or writing a record.
    pub fn run_foreground<R: Regenerator>(
        &self,
        regenerator: R,
        config: SupervisorConfig,
    ) -> Result<u8, ServiceError> {
        config.validate()?;
        self.serve_until_sigterm(regenerator, config)
    }

    fn serve_until_sigterm<R: Regenerator>(
        &self,
        regenerator: R,
        config: SupervisorConfig,
    ) -> Result<u8, ServiceError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(ServiceError::Runtime)?;

        runtime.block_on(async {
            let stop = signals::install_termination_handler().map_err(ServiceError::SignalHandler)?;
            Supervisor::new(self.workdir.clone(), regenerator, config)
                .serve(stop)
                .await
        })
    }
}
