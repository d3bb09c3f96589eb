//! Process-service primitives: detach, probe, signal.

use nix::errno::Errno;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;

use crate::domain::{ServiceError, StopScope};

/// Detach from the controlling terminal and become a session leader.
///
/// The working directory and stdio are kept, so relative paths and the
/// tracing output keep working. Must run before any tokio runtime exists:
/// only the calling thread survives the fork.
pub fn daemonize() -> Result<(), ServiceError> {
    nix::unistd::daemon(true, true).map_err(ServiceError::Daemonize)
}

/// Non-destructive existence check (signal 0).
pub fn is_alive(pid: i32) -> bool {
    // pid <= 0 would address a whole process group
    if pid <= 0 {
        return false;
    }
    match signal::kill(Pid::from_raw(pid), None) {
        Ok(()) => true,
        // exists but belongs to someone else
        Err(Errno::EPERM) => true,
        Err(_) => false,
    }
}

/// Deliver SIGTERM to `pid`, or to process group `pgid` for [`StopScope::Group`].
pub fn terminate(pid: i32, pgid: Option<i32>, scope: StopScope) -> Result<(), ServiceError> {
    let target = match scope {
        StopScope::Process => pid,
        StopScope::Group => pgid.unwrap_or(pid),
    };
    if target <= 0 {
        return Err(ServiceError::SignalDelivery {
            target,
            source: Errno::EINVAL,
        });
    }

    let result = match scope {
        StopScope::Process => signal::kill(Pid::from_raw(target), Signal::SIGTERM),
        StopScope::Group => signal::killpg(Pid::from_raw(target), Signal::SIGTERM),
    };
    result.map_err(|source| ServiceError::SignalDelivery { target, source })
}
