//! App layer
//!
//! - **scheduler**: post / wait over the worker pool and the ledger
//! - **supervisor**: 再生成ループと daemon 制御（start / status / stop）
//! - **service_record**, **process**, **signals**: supervisor の部品

pub mod process;
pub mod scheduler;
pub mod service_record;
pub mod signals;
pub mod supervisor;

pub use self::scheduler::{Scheduler, SchedulerBuilder, artifacts_exist};
pub use self::service_record::ServiceRecord;
pub use self::supervisor::{ServiceControl, Supervisor, is_due};
