//! Core domain models for depshift
//!
//! This module contains the fundamental types used throughout the application:
//! - Declared constraints and resolved packages
//! - Version scope policy
//! - Planned actions and execution units
//! - Per-package results, system test reports and the run summary

mod constraint;
mod package;
mod plan;
mod scope;
mod summary;
mod test_report;
mod update_result;

pub use constraint::{is_floating_version, version_segments, ConstraintKind, DeclaredVersion};
pub use package::{InstallStatus, Package, PackageType};
pub use plan::{ExecutionUnit, PlannedAction};
pub use scope::{ScopeBound, ScopeLevel, UpdateScope};
pub use summary::{RunSummary, Verdict};
pub use test_report::{SystemTestReport, TestPhase, TestResult, TestStatus};
pub use update_result::{FailureKind, Outcome, PackageResult};
