//! Errors - エラー型と分類
//!
//! Job-level failures (`ProduceError`) never escape a worker: they only change
//! ledger state and show up as events. Everything else is returned to the caller.

use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

/// A task key could not be built from the given artifact paths.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("task key needs at least one artifact path")]
    Empty,

    #[error("cannot resolve artifact path {path:?}: {source}")]
    Resolve {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("worker pool needs at least one worker")]
    NoWorkers,

    #[error("worker pool must be spawned inside a tokio runtime")]
    NoRuntime,

    #[error("worker pool is shut down")]
    Closed,
}

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("scheduler is draining, no new tasks are accepted")]
    Closed,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Pool(#[from] PoolError),
}

/// Why a producer did not produce its artifacts.
#[derive(Debug, Error)]
pub enum ProduceError {
    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("`{command}` exited with {status}")]
    Command { command: String, status: ExitStatus },

    #[error("producer panicked: {0}")]
    Panicked(String),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("workers must be at least 1")]
    ZeroWorkers,

    #[error("poll_interval must be greater than zero")]
    ZeroPollInterval,

    #[error("service_name must not be empty or contain a path separator")]
    InvalidServiceName,
}

/// A regeneration cycle failed. The supervisor logs it and keeps looping.
#[derive(Debug, Error)]
pub enum RegenerateError {
    #[error(transparent)]
    Key(#[from] KeyError),

    #[error(transparent)]
    Schedule(#[from] ScheduleError),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("{0}")]
    Other(String),
}

/// Errors of the service lifecycle (start / status / stop).
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("already running (pid {pid})")]
    AlreadyRunning { pid: i32 },

    #[error("failed to detach from the controlling terminal: {0}")]
    Daemonize(#[source] nix::Error),

    #[error("service record {path:?}: {source}")]
    Record {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to build the async runtime: {0}")]
    Runtime(#[source] io::Error),

    #[error("failed to install the termination handler: {0}")]
    SignalHandler(#[source] io::Error),

    #[error("failed to deliver SIGTERM to {target}: {source}")]
    SignalDelivery {
        target: i32,
        #[source]
        source: nix::Error,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Schedule(#[from] ScheduleError),
}
