//! Scheduler - "ensure the artifacts of key K exist" as deduplicated tasks.
//!
//! # post の判定順
//! 1. 全 artifact が存在する -> `skip`
//! 2. ledger を見る
//!    - なし -> `queue`
//!    - Queued / Running -> `working`（何もしない）
//!    - Failed -> `requeue`（再投入）
//!    - Succeeded -> ロック内で artifact を再確認: あれば `skip`、なければ警告 + `restart`（再投入）
//!
//! The decision (ledger read + submit + ledger write) runs under one lock so
//! two `post` calls can never start two attempts for the same key. The lock is
//! never held while a producer runs.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use crate::config::SchedulerConfig;
use crate::domain::{
    AttemptId, JobEvent, PostOutcome, ProduceError, ScheduleError, StatusTag, TaskKey, TaskState,
};
use crate::impls::{LocalArtifactStore, TracingEventSink};
use crate::ledger::{TaskHandle, TaskLedger};
use crate::observability::LedgerCounts;
use crate::ports::{ArtifactStore, EventSink};
use crate::worker::WorkerPool;

/// SchedulerBuilder wires the pool, the ledger, and the ports together.
///
/// # 使用例
/// ```ignore
/// let scheduler = Scheduler::builder(SchedulerConfig::with_workers(2))
///     .events(Arc::new(MemoryEventSink::new()))
///     .build()?;
/// ```
pub struct SchedulerBuilder {
    config: SchedulerConfig,
    artifacts: Arc<dyn ArtifactStore>,
    events: Arc<dyn EventSink>,
}

impl SchedulerBuilder {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            artifacts: Arc::new(LocalArtifactStore::new()),
            events: Arc::new(TracingEventSink::new()),
        }
    }

    pub fn artifacts(mut self, artifacts: Arc<dyn ArtifactStore>) -> Self {
        self.artifacts = artifacts;
        self
    }

    pub fn events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Validate the config and spawn the workers. Must run inside a tokio runtime.
    pub fn build(self) -> Result<Scheduler, ScheduleError> {
        self.config.validate()?;
        let pool = WorkerPool::spawn(self.config.workers)?;
        Ok(Scheduler {
            pool,
            shared: Arc::new(Shared {
                ledger: TaskLedger::new(),
                artifacts: self.artifacts,
                events: self.events,
            }),
            decisions: Mutex::new(()),
        })
    }
}

/// State shared between the control thread and the workers.
struct Shared {
    ledger: TaskLedger,
    artifacts: Arc<dyn ArtifactStore>,
    events: Arc<dyn EventSink>,
}

impl Shared {
    fn emit(&self, event: JobEvent) {
        self.events.emit(&event);
    }

    fn emit_status(&self, tag: StatusTag, key: &TaskKey, attempt: Option<AttemptId>) {
        self.emit(JobEvent::status(tag, key.canonical(), attempt));
    }
}

/// What the ledger says should happen for a key whose artifacts were missing.
enum Decision {
    Submit(StatusTag, PostOutcome),
    AlreadyInFlight,
    /// The attempt finished after the unlocked existence check.
    AlreadyDone,
}

pub struct Scheduler {
    pool: WorkerPool,
    shared: Arc<Shared>,
    decisions: Mutex<()>,
}

impl Scheduler {
    pub fn builder(config: SchedulerConfig) -> SchedulerBuilder {
        SchedulerBuilder::new(config)
    }

    /// Ensure the artifacts of `key` exist, running `producer` if needed.
    ///
    /// Never blocks on the producer. The producer is dropped unrun when the
    /// key is skipped or already in flight.
    pub fn post<F>(&self, key: &TaskKey, producer: F) -> Result<PostOutcome, ScheduleError>
    where
        F: FnOnce() -> Result<(), ProduceError> + Send + 'static,
    {
        if self.shared.artifacts.missing(key).is_empty() {
            self.shared.emit_status(StatusTag::Skip, key, None);
            return Ok(PostOutcome::Skipped);
        }

        let _decision = self.decisions.lock().unwrap_or_else(PoisonError::into_inner);

        let decision = match self.shared.ledger.status_of(key) {
            None => Decision::Submit(StatusTag::Queue, PostOutcome::Queued),
            Some(TaskState::Queued | TaskState::Running) => Decision::AlreadyInFlight,
            Some(TaskState::Failed) => Decision::Submit(StatusTag::Requeue, PostOutcome::Requeued),
            Some(TaskState::Succeeded) => {
                // ロック取得前の確認は古いかもしれないので、ここで見直す
                if self.shared.artifacts.missing(key).is_empty() {
                    Decision::AlreadyDone
                } else {
                    Decision::Submit(StatusTag::Restart, PostOutcome::Requeued)
                }
            }
        };

        match decision {
            Decision::AlreadyDone => {
                self.shared.emit_status(StatusTag::Skip, key, None);
                Ok(PostOutcome::Skipped)
            }
            Decision::AlreadyInFlight => {
                self.shared.emit_status(StatusTag::Working, key, None);
                Ok(PostOutcome::InProgress)
            }
            Decision::Submit(tag, outcome) => {
                self.submit(key, tag, producer)?;
                Ok(outcome)
            }
        }
    }

    /// Caller holds the decision lock.
    fn submit<F>(&self, key: &TaskKey, tag: StatusTag, producer: F) -> Result<(), ScheduleError>
    where
        F: FnOnce() -> Result<(), ProduceError> + Send + 'static,
    {
        if self.pool.is_closed() {
            return Err(ScheduleError::Closed);
        }
        if tag == StatusTag::Restart {
            self.shared.emit(JobEvent::Inconsistent {
                key: key.canonical().to_path_buf(),
            });
        }
        // worker の `start` より先に出す
        self.shared.emit_status(tag, key, None);
        self.enqueue(key, producer)
    }

    /// Record a fresh attempt and hand it to the pool.
    fn enqueue<F>(&self, key: &TaskKey, producer: F) -> Result<(), ScheduleError>
    where
        F: FnOnce() -> Result<(), ProduceError> + Send + 'static,
    {
        // ledger を先に書く: worker が先に走っても entry は必ず存在する
        let attempt = AttemptId::generate();
        self.shared.ledger.record_queued(key, attempt);

        let run = TaskRun {
            key: key.clone(),
            attempt,
            shared: Arc::clone(&self.shared),
        };
        if self.pool.submit(move || run.execute(producer)).is_err() {
            // shutdown won the race: the attempt never runs, so close it out
            self.shared
                .emit_status(StatusTag::Fail, key, Some(attempt));
            self.shared.ledger.record_result(key, attempt, false);
            return Err(ScheduleError::Closed);
        }
        Ok(())
    }

    /// Stop accepting new tasks and wait for every submitted task to finish.
    pub async fn wait(&self) {
        self.pool.shutdown().await;
    }

    pub fn status_of(&self, key: &TaskKey) -> Option<TaskState> {
        self.shared.ledger.status_of(key)
    }

    /// Handle for the latest attempt of `key`.
    pub fn handle(&self, key: &TaskKey) -> Option<TaskHandle> {
        self.shared.ledger.handle(key)
    }

    pub fn counts(&self) -> LedgerCounts {
        self.shared.ledger.counts()
    }

    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }
}

/// Task body: runs on a worker thread.
struct TaskRun {
    key: TaskKey,
    attempt: AttemptId,
    shared: Arc<Shared>,
}

impl TaskRun {
    fn execute<F>(self, producer: F)
    where
        F: FnOnce() -> Result<(), ProduceError>,
    {
        self.shared.ledger.mark_running(&self.key, self.attempt);
        self.shared
            .emit_status(StatusTag::Start, &self.key, Some(self.attempt));

        let produced = match panic::catch_unwind(AssertUnwindSafe(producer)) {
            Ok(Ok(())) => true,
            Ok(Err(err)) => {
                self.report_failure(err);
                false
            }
            Err(payload) => {
                self.report_failure(ProduceError::Panicked(panic_message(payload.as_ref())));
                false
            }
        };
        let success = produced && self.verify_artifacts();

        let tag = if success {
            StatusTag::Create
        } else {
            StatusTag::Fail
        };
        self.shared.emit_status(tag, &self.key, Some(self.attempt));
        // 最後に ledger を更新する: handle の完了通知は全イベントの後
        self.shared
            .ledger
            .record_result(&self.key, self.attempt, success);
    }

    fn report_failure(&self, err: ProduceError) {
        self.shared.emit(JobEvent::ProducerFailed {
            key: self.key.canonical().to_path_buf(),
            attempt: self.attempt,
            reason: err.to_string(),
        });
    }

    /// The producer said it succeeded; check that it really did.
    fn verify_artifacts(&self) -> bool {
        let missing: Vec<PathBuf> = self.shared.artifacts.missing(&self.key);
        if missing.is_empty() {
            return true;
        }
        self.shared.emit(JobEvent::MissingArtifacts {
            key: self.key.canonical().to_path_buf(),
            attempt: self.attempt,
            missing,
        });
        false
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Whether every one of `paths` exists in `store`.
pub fn artifacts_exist(store: &dyn ArtifactStore, paths: &[impl AsRef<Path>]) -> bool {
    paths.iter().all(|path| store.exists(path.as_ref()))
}
