//! Child process supervision.
//!
//! Launches the session's child process with its stdin/stdout bound to the
//! two named pipes and polls its liveness without blocking. Relaunching is
//! lazy: nothing here monitors the child in the background — the session
//! polls at the top of each public entry point and relaunches on demand.

use std::fs::File;
use std::process::Stdio;

use tokio::process::{Child, Command};
use tracing::{info, warn};

use crate::config::SessionConfig;
use crate::{AppError, Result};

/// Spawn the configured child process for a new generation.
///
/// `stdin` and `stdout` are duplex handles on the input and output pipes;
/// they become the child's standard streams. The child starts in
/// `working_dir` and carries `kill_on_drop` so an abandoned session cannot
/// leak the process.
///
/// # Errors
///
/// Returns `AppError::Spawn` if the executable cannot be launched.
pub fn spawn_child(
    config: &SessionConfig,
    stdin: File,
    stdout: File,
    generation: u64,
) -> Result<Child> {
    let mut cmd = Command::new(&config.child_command);
    cmd.args(&config.child_args)
        .current_dir(&config.working_dir)
        .stdin(Stdio::from(stdin))
        .stdout(Stdio::from(stdout))
        .kill_on_drop(true);

    let child = cmd.spawn().map_err(|err| {
        AppError::Spawn(format!(
            "failed to spawn {}: {err}",
            config.child_command
        ))
    })?;

    info!(
        pid = child.id().unwrap_or(0),
        command = %config.child_command,
        generation,
        "child process spawned"
    );

    Ok(child)
}

/// Non-blocking liveness poll of the child process.
///
/// `true` iff a handle exists and no exit status is available yet. A poll
/// error is treated as exited so the caller relaunches.
pub fn is_running(child: Option<&mut Child>) -> bool {
    let Some(process) = child else {
        return false;
    };

    match process.try_wait() {
        Ok(None) => true,
        Ok(Some(status)) => {
            info!(%status, "child process exited");
            false
        }
        Err(err) => {
            warn!(%err, "failed to poll child process status");
            false
        }
    }
}
