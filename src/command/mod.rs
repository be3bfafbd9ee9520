//! External command execution
//!
//! This module provides:
//! - The `CommandRunner` trait used for update, lock, version and test commands
//! - A shell-backed runner with timeouts and cancellation
//! - Command template rendering with shell-safe placeholder values
//! - A cancellation signal shared across a run

mod cancel;
mod shell;
mod template;

pub use cancel::{cancel_pair, CancelHandle, CancelSignal};
pub use shell::ShellCommandRunner;
pub use template::{render_template, validate_template, TemplateVars, PLACEHOLDERS};

use crate::error::CommandError;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// A command script to run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRequest {
    /// Shell script, possibly multi-line
    pub script: String,
    /// Directory the script runs in
    pub working_dir: PathBuf,
    /// Extra environment variables
    pub env: BTreeMap<String, String>,
    /// Kill the process after this long
    pub timeout: Option<Duration>,
}

impl CommandRequest {
    /// Creates a request without extra environment or timeout
    pub fn new(script: impl Into<String>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            script: script.into(),
            working_dir: working_dir.into(),
            env: BTreeMap::new(),
            timeout: None,
        }
    }

    /// Sets extra environment variables (builder pattern)
    pub fn with_env(mut self, env: BTreeMap<String, String>) -> Self {
        self.env = env;
        self
    }

    /// Sets the timeout (builder pattern)
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Short form of the script for messages
    pub fn display(&self) -> String {
        let mut lines = self.script.lines().map(str::trim).filter(|l| !l.is_empty());
        let first = lines.next().unwrap_or_default().to_string();
        if lines.next().is_some() {
            format!("{} ...", first)
        } else {
            first
        }
    }
}

/// Captured output of a successful command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Standard output
    pub stdout: String,
    /// Standard error
    pub stderr: String,
    /// Wall-clock duration
    pub duration: Duration,
}

/// Runs external commands
///
/// Implementations must stop the process when the timeout expires or the
/// signal is cancelled instead of waiting for it to finish.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run a script; non-zero exit, timeout and cancellation are errors
    async fn run(
        &self,
        request: &CommandRequest,
        cancel: &CancelSignal,
    ) -> Result<CommandOutput, CommandError>;
}
