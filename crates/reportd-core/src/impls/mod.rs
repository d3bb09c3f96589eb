//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **LocalArtifactStore**: ローカルファイルシステム
//! - **TracingEventSink**: tracing に status line を出す（デフォルト）
//! - **MemoryEventSink**: イベントをメモリに貯める（テスト用）
//! - **shell**: シェルコマンドを producer として実行

pub mod local_artifacts;
pub mod log_sink;
pub mod memory_sink;
pub mod shell;

pub use self::local_artifacts::LocalArtifactStore;
pub use self::log_sink::TracingEventSink;
pub use self::memory_sink::MemoryEventSink;
pub use self::shell::run_shell;
