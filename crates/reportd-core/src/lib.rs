//! reportd-core
//!
//! Core building blocks for the reportd regeneration daemon.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（key, ids, state, events, outcome, errors）
//! - **ports**: 抽象化レイヤー（ArtifactStore, EventSink, Clock, Regenerator）
//! - **impls**: ports の実装（LocalArtifactStore, TracingEventSink, MemoryEventSink, shell）
//! - **worker**: 固定サイズの worker pool
//! - **ledger**: key ごとの最新 attempt の状態
//! - **app**: Scheduler と Supervisor（daemon 制御）
//! - **config**: Scheduler / Supervisor の設定
//! - **observability**: ledger の集計ビュー
//!
//! Unix only: daemonization and signal delivery go through `nix`.

pub mod app;
pub mod config;
pub mod domain;
pub mod impls;
pub mod ledger;
pub mod observability;
pub mod ports;
pub mod worker;

pub use app::{Scheduler, SchedulerBuilder, ServiceControl, Supervisor};
pub use config::{SchedulerConfig, SupervisorConfig};
pub use domain::{PostOutcome, ServiceStatus, StopOutcome, StopScope, TaskKey, TaskState};
