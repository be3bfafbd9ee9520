//! Application error types using thiserror
//!
//! Error hierarchy:
//! - ConfigError: Missing or invalid configuration, aborts before any mutation
//! - UnsupportedError: Operation not configured for a package, never fatal
//! - CommandError: External command failures (exit status, timeout, cancellation)
//! - ValidationError: System test failures
//! - DriftError: Manifest or lock state that does not match the planned version
//! - RollbackError: Snapshot capture and restore failures
//! - PartialSuccessError: Aggregate error for runs with mixed outcomes
//! - ExitError: Message and process exit code for the binary

use std::path::PathBuf;
use thiserror::Error;

/// Application-level error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration related errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Operation not configured for a package
    #[error(transparent)]
    Unsupported(#[from] UnsupportedError),

    /// External command failures
    #[error(transparent)]
    Command(#[from] CommandError),

    /// System test failures
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Post-update state does not match the plan
    #[error(transparent)]
    Drift(#[from] DriftError),

    /// Snapshot capture or restore failures
    #[error(transparent)]
    Rollback(#[from] RollbackError),

    /// Some packages updated, some failed
    #[error(transparent)]
    PartialSuccess(#[from] PartialSuccessError),
}

/// Errors related to configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file not found
    #[error("configuration file not found: {path}")]
    NotFound { path: PathBuf },

    /// Failed to read config file
    #[error("failed to read configuration file {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// TOML parsing error
    #[error("failed to parse TOML in {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    /// Config file declares no rules
    #[error("no rules configured in {path}")]
    NoRules { path: PathBuf },

    /// Invalid field value
    #[error("invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },

    /// Command template references an unknown placeholder or is malformed
    #[error("invalid command template '{template}': {message}")]
    InvalidTemplate { template: String, message: String },

    /// Invalid regex pattern
    #[error("invalid pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    /// Executable required by a rule is not available
    #[error("command '{command}' required by rule '{rule}' was not found in PATH")]
    CommandNotFound { rule: String, command: String },

    /// Preflight system tests failed with stop_on_fail
    #[error("system tests failed before updates: {summary}")]
    PreflightFailed { summary: String },

    /// Conflicting options
    #[error("conflicting options: {message}")]
    ConflictingOptions { message: String },
}

/// Operation not configured for a package or rule
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{operation} not supported for {package}: {reason}")]
pub struct UnsupportedError {
    pub operation: String,
    pub package: String,
    pub reason: String,
}

/// Errors from running external commands
#[derive(Error, Debug)]
pub enum CommandError {
    /// The process could not be started
    #[error("failed to start `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The process exited unsuccessfully
    #[error("`{command}` failed with {}: {output}", exit_label(.code))]
    Failed {
        command: String,
        code: Option<i32>,
        output: String,
    },

    /// The process exceeded its timeout and was killed
    #[error("`{command}` timed out after {seconds} seconds")]
    TimedOut { command: String, seconds: u64 },

    /// The run was cancelled while the process was running
    #[error("`{command}` was cancelled")]
    Cancelled { command: String },
}

/// System test failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Preflight tests failed
    #[error("system tests failed before updates: {summary}")]
    BeforeUpdates { summary: String },

    /// Tests run after a single unit failed
    #[error("system tests failed after updating {unit}: {summary}")]
    AfterUnit { unit: String, summary: String },

    /// Tests run once after all units failed
    #[error("system tests failed after updates: {summary}")]
    AfterUpdates { summary: String },
}

/// Differences between the planned and the re-resolved package state
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DriftError {
    /// Packages could not be resolved again
    #[error("could not reload packages: {message}")]
    Reload { message: String },

    /// The package no longer appears in its manifest
    #[error("package {package} missing after update")]
    Missing { package: String },

    /// The declared version is not the target
    #[error("version mismatch after update: expected {expected}, found {found}")]
    Declared { expected: String, found: String },

    /// The lock data still records another version
    #[error("installed version mismatch after update: expected {expected}, got {found} (lock file may not have been updated)")]
    Installed { expected: String, found: String },

    /// The declared version was not restored
    #[error("version mismatch after restore of {package}: expected {expected}, found {found}")]
    NotRestored {
        package: String,
        expected: String,
        found: String,
    },
}

/// Snapshot capture and restore failures
#[derive(Error, Debug)]
pub enum RollbackError {
    /// Reading a file for the snapshot failed
    #[error("failed to snapshot {path}: {source}")]
    Capture {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Writing back a snapshot failed
    #[error("failed to restore {path}: {source}; manual intervention required")]
    Restore {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Files were written back but the manifest still disagrees
    #[error("{0}; manual intervention required")]
    Unverified(DriftError),
}

/// Aggregate error returned when the run ends in partial failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{succeeded} succeeded, {failed} failed")]
pub struct PartialSuccessError {
    pub succeeded: usize,
    pub failed: usize,
}

/// Error carrying the process exit code, returned by the binary's `run`
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ExitError {
    pub code: u8,
    pub message: String,
}

impl ExitError {
    /// Creates a new ExitError
    pub fn new(code: u8, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "a signal".to_string(),
    }
}

impl ConfigError {
    /// Creates a new NotFound error
    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        ConfigError::NotFound { path: path.into() }
    }

    /// Creates a new ReadError
    pub fn read_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::ReadError {
            path: path.into(),
            source,
        }
    }

    /// Creates a new ParseError
    pub fn parse_error(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        ConfigError::ParseError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a new InvalidValue error
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Creates a new InvalidTemplate error
    pub fn invalid_template(template: impl Into<String>, message: impl Into<String>) -> Self {
        ConfigError::InvalidTemplate {
            template: template.into(),
            message: message.into(),
        }
    }

    /// Creates a new InvalidPattern error
    pub fn invalid_pattern(pattern: impl Into<String>, message: impl Into<String>) -> Self {
        ConfigError::InvalidPattern {
            pattern: pattern.into(),
            message: message.into(),
        }
    }
}

impl UnsupportedError {
    /// Creates a new UnsupportedError
    pub fn new(
        operation: impl Into<String>,
        package: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            operation: operation.into(),
            package: package.into(),
            reason: reason.into(),
        }
    }
}

impl CommandError {
    /// Creates a new Failed error from captured output
    pub fn failed(command: impl Into<String>, code: Option<i32>, stdout: &str, stderr: &str) -> Self {
        // stderr carries the useful message for most tools; fall back to stdout
        let output = if stderr.trim().is_empty() {
            stdout.trim()
        } else {
            stderr.trim()
        };
        CommandError::Failed {
            command: command.into(),
            code,
            output: output.to_string(),
        }
    }

    /// Returns true if the command was cancelled
    pub fn is_cancelled(&self) -> bool {
        matches!(self, CommandError::Cancelled { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_not_found() {
        let err = ConfigError::not_found("/path/to/depshift.toml");
        let msg = err.to_string();
        assert!(msg.contains("not found"));
        assert!(msg.contains("/path/to/depshift.toml"));
    }

    #[test]
    fn test_config_error_parse_error() {
        let err = ConfigError::parse_error("depshift.toml", "expected `=`");
        let msg = err.to_string();
        assert!(msg.contains("failed to parse TOML"));
        assert!(msg.contains("expected `=`"));
    }

    #[test]
    fn test_config_error_preflight_failed() {
        let err = ConfigError::PreflightFailed {
            summary: "0/1 system tests passed (1 failed)".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "system tests failed before updates: 0/1 system tests passed (1 failed)"
        );
    }

    #[test]
    fn test_config_error_command_not_found() {
        let err = ConfigError::CommandNotFound {
            rule: "npm".to_string(),
            command: "npm".to_string(),
        };
        assert!(err.to_string().contains("required by rule 'npm'"));
    }

    #[test]
    fn test_unsupported_error_display() {
        let err = UnsupportedError::new("update", "react", "no commands configured");
        assert_eq!(
            err.to_string(),
            "update not supported for react: no commands configured"
        );
    }

    #[test]
    fn test_command_error_failed_prefers_stderr() {
        let err = CommandError::failed("npm install", Some(1), "stdout text", "boom\n");
        let msg = err.to_string();
        assert!(msg.contains("exit code 1"));
        assert!(msg.contains("boom"));
        assert!(!msg.contains("stdout text"));
    }

    #[test]
    fn test_command_error_failed_falls_back_to_stdout() {
        let err = CommandError::failed("make", None, "only stdout", "  ");
        let msg = err.to_string();
        assert!(msg.contains("a signal"));
        assert!(msg.contains("only stdout"));
    }

    #[test]
    fn test_command_error_timeout() {
        let err = CommandError::TimedOut {
            command: "sleep 10".to_string(),
            seconds: 1,
        };
        assert!(err.to_string().contains("timed out after 1 seconds"));
        assert!(!err.is_cancelled());
    }

    #[test]
    fn test_validation_error_after_updates() {
        let err = ValidationError::AfterUpdates {
            summary: "0/1 system tests passed (1 failed)".to_string(),
        };
        assert!(err
            .to_string()
            .starts_with("system tests failed after updates"));
    }

    #[test]
    fn test_rollback_error_restore_is_loud() {
        let err = RollbackError::Restore {
            path: PathBuf::from("package.json"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(err.to_string().contains("manual intervention required"));
    }

    #[test]
    fn test_partial_success_error() {
        let err = PartialSuccessError {
            succeeded: 1,
            failed: 2,
        };
        assert_eq!(err.to_string(), "1 succeeded, 2 failed");
    }

    #[test]
    fn test_exit_error() {
        let err = ExitError::new(3, "configuration file not found: depshift.toml");
        assert_eq!(err.code, 3);
        assert_eq!(err.to_string(), "configuration file not found: depshift.toml");
    }

    #[test]
    fn test_app_error_from_config() {
        let err: AppError = ConfigError::not_found("x").into();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_app_error_from_partial_success() {
        let err: AppError = PartialSuccessError {
            succeeded: 1,
            failed: 1,
        }
        .into();
        assert!(matches!(err, AppError::PartialSuccess(_)));
        assert_eq!(err.to_string(), "1 succeeded, 1 failed");
    }
}
