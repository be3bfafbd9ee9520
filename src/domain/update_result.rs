//! Per-package outcome types

use super::Package;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Final outcome for a single package
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Update command applied and kept
    Updated,
    /// Dry run: an update would have been applied
    Planned,
    /// No newer version within scope
    UpToDate,
    /// Update, lock or validation failed
    Failed,
    /// Not attempted (filtered, ignored, cancelled, or halted run)
    Skipped,
    /// Update is not configured or not possible for this package
    Unsupported,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Outcome::Updated => "Updated",
            Outcome::Planned => "Planned",
            Outcome::UpToDate => "UpToDate",
            Outcome::Failed => "Failed",
            Outcome::Skipped => "Skipped",
            Outcome::Unsupported => "Unsupported",
        };
        f.write_str(s)
    }
}

/// Why a package failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Per-package configuration could not be resolved
    Config,
    /// The update or lock command failed
    Execution,
    /// The update applied but system tests failed
    Validation,
    /// Restoring the snapshot failed
    Rollback,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::Config => "config",
            FailureKind::Execution => "execution",
            FailureKind::Validation => "validation",
            FailureKind::Rollback => "rollback",
        };
        f.write_str(s)
    }
}

/// Outcome of processing one package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageResult {
    /// The package
    pub package: Package,
    /// Final outcome
    pub outcome: Outcome,
    /// Target version applied or planned
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    /// Display group of the execution unit
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    /// Failure classification for failed results
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
    /// Error detail or skip/unsupported explanation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl PackageResult {
    fn new(package: Package, outcome: Outcome) -> Self {
        Self {
            group: package.group.clone(),
            package,
            outcome,
            target: None,
            failure: None,
            reason: None,
        }
    }

    /// Creates an Updated result
    pub fn updated(package: Package, target: impl Into<String>) -> Self {
        let mut result = Self::new(package, Outcome::Updated);
        result.target = Some(target.into());
        result
    }

    /// Creates a Planned (dry-run) result
    pub fn planned(package: Package, target: impl Into<String>) -> Self {
        let mut result = Self::new(package, Outcome::Planned);
        result.target = Some(target.into());
        result
    }

    /// Creates an UpToDate result
    pub fn up_to_date(package: Package) -> Self {
        Self::new(package, Outcome::UpToDate)
    }

    /// Creates a Failed result
    pub fn failed(package: Package, kind: FailureKind, message: impl Into<String>) -> Self {
        let mut result = Self::new(package, Outcome::Failed);
        result.failure = Some(kind);
        result.reason = Some(message.into());
        result
    }

    /// Creates a Skipped result
    pub fn skipped(package: Package, reason: impl Into<String>) -> Self {
        let mut result = Self::new(package, Outcome::Skipped);
        result.reason = Some(reason.into());
        result
    }

    /// Creates an Unsupported result
    pub fn unsupported(package: Package, reason: impl Into<String>) -> Self {
        let mut result = Self::new(package, Outcome::Unsupported);
        result.reason = Some(reason.into());
        result
    }

    /// Sets the display group (builder pattern)
    pub fn with_group(mut self, group: Option<String>) -> Self {
        self.group = group;
        self
    }

    /// Sets the target version (builder pattern)
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Returns a Failed copy of this result, keeping package, target and group
    pub fn into_failed(self, kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            outcome: Outcome::Failed,
            failure: Some(kind),
            reason: Some(message.into()),
            ..self
        }
    }

    /// Returns true if the update was applied
    pub fn is_updated(&self) -> bool {
        self.outcome == Outcome::Updated
    }

    /// Returns true if the package failed
    pub fn is_failed(&self) -> bool {
        self.outcome == Outcome::Failed
    }

    /// Returns the package name
    pub fn package_name(&self) -> &str {
        &self.package.name
    }
}

impl fmt::Display for PackageResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.outcome {
            Outcome::Updated | Outcome::Planned => write!(
                f,
                "{}: {} → {}",
                self.package.name,
                self.package.current_version(),
                self.target.as_deref().unwrap_or("?")
            ),
            _ => match &self.reason {
                Some(reason) => write!(f, "{}: {} ({})", self.package.name, self.outcome, reason),
                None => write!(f, "{}: {}", self.package.name, self.outcome),
            },
        }
    }
}
