//! Domain model (keys, ids, states, events, outcomes, errors).

pub mod errors;
pub mod events;
pub mod ids;
pub mod key;
pub mod outcome;
pub mod state;

pub use errors::{
    ConfigError, KeyError, PoolError, ProduceError, RegenerateError, ScheduleError, ServiceError,
};
pub use events::{JobEvent, Severity, StatusTag};
pub use ids::AttemptId;
pub use key::TaskKey;
pub use outcome::{
    PostOutcome, ServiceState, ServiceStatus, StopOutcome, StopScope, TERMINATED_EXIT_CODE,
};
pub use state::TaskState;
