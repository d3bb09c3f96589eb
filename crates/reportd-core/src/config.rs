//! Configuration for the scheduler and the supervisor.
//!
//! Durations are (de)serialized as seconds.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::ConfigError;

pub const DEFAULT_SERVICE_NAME: &str = "reportd";
pub const DEFAULT_WORKERS: usize = 4;
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(60);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Number of producers that may run at the same time.
    pub workers: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
        }
    }
}

impl SchedulerConfig {
    pub fn with_workers(workers: usize) -> Self {
        Self { workers }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::ZeroWorkers);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SupervisorConfig {
    /// Base name of the service record: `{workdir}/{service_name}.pid`.
    pub service_name: String,

    /// Minimum time between two regeneration cycles.
    #[serde(with = "secs")]
    pub interval: Duration,

    /// How often the loop wakes up to check for a stop request or a due cycle.
    #[serde(with = "secs")]
    pub poll_interval: Duration,

    #[serde(flatten)]
    pub scheduler: SchedulerConfig,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            interval: DEFAULT_INTERVAL,
            poll_interval: DEFAULT_POLL_INTERVAL,
            scheduler: SchedulerConfig::default(),
        }
    }
}

impl SupervisorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.is_empty() || self.service_name.contains(std::path::MAIN_SEPARATOR) {
            return Err(ConfigError::InvalidServiceName);
        }
        if self.poll_interval.is_zero() {
            return Err(ConfigError::ZeroPollInterval);
        }
        self.scheduler.validate()
    }
}

mod secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}
