//! Shell-backed command runner

use super::{CancelSignal, CommandOutput, CommandRequest, CommandRunner};
use crate::error::CommandError;
use async_trait::async_trait;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::debug;

/// Runs scripts through the platform shell
#[derive(Debug, Clone)]
pub struct ShellCommandRunner {
    shell: String,
    shell_arg: String,
    fail_fast: bool,
}

impl Default for ShellCommandRunner {
    fn default() -> Self {
        if cfg!(windows) {
            Self {
                shell: "cmd".to_string(),
                shell_arg: "/C".to_string(),
                fail_fast: false,
            }
        } else {
            Self {
                shell: "sh".to_string(),
                shell_arg: "-c".to_string(),
                fail_fast: true,
            }
        }
    }
}

impl ShellCommandRunner {
    /// Creates a runner for the platform shell
    pub fn new() -> Self {
        Self::default()
    }

    fn script(&self, request: &CommandRequest) -> String {
        if self.fail_fast {
            // Multi-line scripts stop at the first failing line
            format!("set -e\n{}", request.script)
        } else {
            request.script.clone()
        }
    }
}

async fn sleep_for(timeout: Option<Duration>) {
    match timeout {
        Some(duration) => tokio::time::sleep(duration).await,
        None => std::future::pending::<()>().await,
    }
}

/// Kills the process group led by `pid`
///
/// The shell runs in its own group, so package manager processes it started
/// go down with it. The leader is not reaped yet, which keeps the group id
/// from being reused.
#[cfg(unix)]
fn kill_process_group(pid: Option<u32>) {
    let Some(pid) = pid.and_then(|p| i32::try_from(p).ok()) else {
        return;
    };
    // SAFETY: kill(2) only sends a signal; no memory is shared
    let rc = unsafe { libc::kill(-pid, libc::SIGKILL) };
    if rc != 0 {
        debug!(pid, "process group already exited");
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: Option<u32>) {}

#[async_trait]
impl CommandRunner for ShellCommandRunner {
    async fn run(
        &self,
        request: &CommandRequest,
        cancel: &CancelSignal,
    ) -> Result<CommandOutput, CommandError> {
        let shown = request.display();
        if cancel.is_cancelled() {
            return Err(CommandError::Cancelled { command: shown });
        }

        debug!(command = %shown, dir = %request.working_dir.display(), "running command");

        let mut command = Command::new(&self.shell);
        command
            .arg(&self.shell_arg)
            .arg(self.script(request))
            .current_dir(&request.working_dir)
            .envs(&request.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        command.process_group(0);

        let started = Instant::now();
        let child = command.spawn().map_err(|source| CommandError::Spawn {
            command: shown.clone(),
            source,
        })?;
        let pid = child.id();

        // Dropping the wait future drops the child, which kills the shell
        let output = tokio::select! {
            result = child.wait_with_output() => result.map_err(|source| CommandError::Spawn {
                command: shown.clone(),
                source,
            })?,
            _ = sleep_for(request.timeout) => {
                kill_process_group(pid);
                return Err(CommandError::TimedOut {
                    command: shown,
                    seconds: request.timeout.map(|t| t.as_secs()).unwrap_or_default(),
                });
            }
            _ = cancel.cancelled() => {
                kill_process_group(pid);
                return Err(CommandError::Cancelled { command: shown });
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        let duration = started.elapsed();

        if !output.status.success() {
            debug!(command = %shown, code = ?output.status.code(), "command failed");
            return Err(CommandError::failed(
                shown,
                output.status.code(),
                &stdout,
                &stderr,
            ));
        }

        Ok(CommandOutput {
            stdout,
            stderr,
            duration,
        })
    }
}
