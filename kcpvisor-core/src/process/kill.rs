//! Forceful process termination
//!
//! Windows has native tree termination through `taskkill`; Unix children are
//! started as process-group leaders, so signalling the group reaches the whole
//! tree.

use crate::error::ProcessError;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, warn};

/// How the supervisor kills its child
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KillStrategy {
    /// `taskkill /T /F /PID <pid>`
    TreeKill,

    /// `SIGKILL` to the child's process group
    SignalKill,
}

impl KillStrategy {
    /// Strategy for the platform this process runs on
    pub fn detect() -> Self {
        if cfg!(windows) {
            KillStrategy::TreeKill
        } else {
            KillStrategy::SignalKill
        }
    }

    /// Forcefully terminate `pid` and its descendants
    pub async fn kill(&self, pid: u32) -> Result<(), ProcessError> {
        debug!(strategy = ?self, pid, "Killing process");
        match self {
            KillStrategy::TreeKill => {
                let output = Command::new("taskkill")
                    .args(taskkill_args(pid))
                    .stdin(Stdio::null())
                    .output()
                    .await;
                taskkill_result(pid, output)
            }
            KillStrategy::SignalKill => signal_kill(pid),
        }
    }

    /// Blocking variant of [`KillStrategy::kill`] for drop paths
    pub fn kill_now(&self, pid: u32) -> Result<(), ProcessError> {
        debug!(strategy = ?self, pid, "Killing process (blocking)");
        match self {
            KillStrategy::TreeKill => {
                let output = std::process::Command::new("taskkill")
                    .args(taskkill_args(pid))
                    .stdin(Stdio::null())
                    .output();
                taskkill_result(pid, output)
            }
            KillStrategy::SignalKill => signal_kill(pid),
        }
    }
}

fn taskkill_args(pid: u32) -> [String; 4] {
    [
        "/T".to_string(),
        "/F".to_string(),
        "/PID".to_string(),
        pid.to_string(),
    ]
}

fn taskkill_result(
    pid: u32,
    output: std::io::Result<std::process::Output>,
) -> Result<(), ProcessError> {
    let output = output.map_err(|e| ProcessError::TerminateFailure {
        pid,
        reason: format!("Failed to run taskkill: {}", e),
    })?;

    if output.status.success() {
        Ok(())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(ProcessError::TerminateFailure {
            pid,
            reason: format!("taskkill exited with {}: {}", output.status, stderr.trim()),
        })
    }
}

#[cfg(unix)]
fn signal_kill(pid: u32) -> Result<(), ProcessError> {
    use nix::errno::Errno;
    use nix::sys::signal::{kill, killpg, Signal};
    use nix::unistd::Pid;

    let target = Pid::from_raw(pid as i32);
    match killpg(target, Signal::SIGKILL) {
        Ok(()) => Ok(()),
        Err(Errno::ESRCH) => {
            // Not a group leader; signal the process itself
            warn!(pid, "No process group for pid, signalling process directly");
            kill(target, Signal::SIGKILL).map_err(|e| ProcessError::TerminateFailure {
                pid,
                reason: format!("Failed to send SIGKILL: {}", e),
            })
        }
        Err(e) => Err(ProcessError::TerminateFailure {
            pid,
            reason: format!("Failed to send SIGKILL to group: {}", e),
        }),
    }
}

#[cfg(not(unix))]
fn signal_kill(pid: u32) -> Result<(), ProcessError> {
    Err(ProcessError::TerminateFailure {
        pid,
        reason: "signals are not available on this platform".to_string(),
    })
}
