use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::domain::PoolError;

/// A unit of blocking work.
pub type Work = Box<dyn FnOnce() + Send + 'static>;

type SharedReceiver = Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<Work>>>;

/// Fixed-size worker pool.
/// - `submit()` はブロックしない（unbounded channel に積むだけ）
/// - `shutdown()` で受付を止め、投入済みの全 work の完了を待つ
///
/// Each worker runs its units on tokio's blocking thread pool one at a time,
/// so at most `n` units execute concurrently.
pub struct WorkerPool {
    submit_tx: Mutex<Option<mpsc::UnboundedSender<Work>>>,
    joins: Mutex<Vec<JoinHandle<()>>>,
}

impl WorkerPool {
    /// Spawn `n` workers on the current tokio runtime.
    pub fn spawn(n: usize) -> Result<Self, PoolError> {
        if n == 0 {
            return Err(PoolError::NoWorkers);
        }
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| PoolError::NoRuntime)?;

        let (submit_tx, submit_rx) = mpsc::unbounded_channel::<Work>();
        let submit_rx: SharedReceiver = Arc::new(tokio::sync::Mutex::new(submit_rx));

        let mut joins = Vec::with_capacity(n);
        for worker_id in 0..n {
            let rx = Arc::clone(&submit_rx);
            joins.push(runtime.spawn(worker_loop(worker_id, rx)));
        }

        Ok(Self {
            submit_tx: Mutex::new(Some(submit_tx)),
            joins: Mutex::new(joins),
        })
    }

    pub fn is_closed(&self) -> bool {
        self.submit_tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    /// Enqueue `work` and return immediately.
    pub fn submit<F>(&self, work: F) -> Result<(), PoolError>
    where
        F: FnOnce() + Send + 'static,
    {
        let guard = self.submit_tx.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(tx) = guard.as_ref() else {
            return Err(PoolError::Closed);
        };
        tx.send(Box::new(work)).map_err(|_| PoolError::Closed)
    }

    /// Stop accepting work and wait until every submitted unit has finished.
    /// In-flight work is never cancelled. Calling it twice is harmless.
    pub async fn shutdown(&self) {
        // sender を drop すると、キューが空になった時点で worker が抜ける
        drop(
            self.submit_tx
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take(),
        );

        let joins = std::mem::take(&mut *self.joins.lock().unwrap_or_else(PoisonError::into_inner));
        for join in joins {
            if let Err(err) = join.await {
                tracing::error!(error = %err, "worker task ended abnormally");
            }
        }
    }
}

async fn worker_loop(worker_id: usize, rx: SharedReceiver) {
    loop {
        // 受信側ロックは recv の間だけ保持する（work 実行中は持たない）
        let work = {
            let mut rx = rx.lock().await;
            rx.recv().await
        };
        let Some(work) = work else {
            break;
        };

        // panic は JoinError として捕まえる。worker 自体は生き残る
        if let Err(err) = tokio::task::spawn_blocking(work).await {
            tracing::error!(worker_id, error = %err, "work unit panicked");
        }
    }
    tracing::debug!(worker_id, "worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn zero_workers_is_rejected() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let _guard = rt.enter();
        assert!(matches!(WorkerPool::spawn(0), Err(PoolError::NoWorkers)));
    }

    #[test]
    fn spawning_outside_a_runtime_is_an_error() {
        assert!(matches!(WorkerPool::spawn(1), Err(PoolError::NoRuntime)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn shutdown_waits_for_all_submitted_work() {
        let pool = WorkerPool::spawn(2).unwrap();
        let done = Arc::new(AtomicUsize::new(0));

        for _ in 0..6 {
            let done = Arc::clone(&done);
            pool.submit(move || {
                std::thread::sleep(Duration::from_millis(20));
                done.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        }

        pool.shutdown().await;
        assert_eq!(done.load(Ordering::SeqCst), 6);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn concurrency_is_bounded_by_size() {
        let pool = WorkerPool::spawn(2).unwrap();
        let current = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        for _ in 0..8 {
            let current = Arc::clone(&current);
            let peak = Arc::clone(&peak);
            pool.submit(move || {
                let now = current.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(15));
                current.fetch_sub(1, Ordering::SeqCst);
            })
            .unwrap();
        }

        pool.shutdown().await;
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn panicking_work_does_not_kill_the_worker() {
        let pool = WorkerPool::spawn(1).unwrap();
        let done = Arc::new(AtomicUsize::new(0));

        pool.submit(|| panic!("boom")).unwrap();
        let counter = Arc::clone(&done);
        pool.submit(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

        pool.shutdown().await;
        assert_eq!(done.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn submit_after_shutdown_is_refused() {
        let pool = WorkerPool::spawn(1).unwrap();
        pool.shutdown().await;

        assert!(pool.is_closed());
        assert!(matches!(pool.submit(|| {}), Err(PoolError::Closed)));
        // idempotent
        pool.shutdown().await;
    }
}
