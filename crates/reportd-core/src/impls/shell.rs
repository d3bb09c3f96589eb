//! Shell producers.

use std::path::Path;
use std::process::Command;

use crate::domain::ProduceError;

/// Run `command` through `sh -c`, optionally inside `cwd`.
///
/// Succeeds iff the command exits with status zero. stdout and stderr are
/// inherited so collaborators' output lands in the daemon's log.
pub fn run_shell(command: &str, cwd: Option<&Path>) -> Result<(), ProduceError> {
    tracing::info!(command, "running shell producer");

    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command);
    if let Some(cwd) = cwd {
        cmd.current_dir(cwd);
    }

    let status = cmd.status().map_err(|source| ProduceError::Spawn {
        command: command.to_string(),
        source,
    })?;

    if status.success() {
        Ok(())
    } else {
        Err(ProduceError::Command {
            command: command.to_string(),
            status,
        })
    }
}
