//! Package resolution and version lookup
//!
//! This module provides:
//! - The `PackageResolver` trait turning configured manifests into packages
//! - The `VersionSource` trait listing newer versions of a package
//! - Command-backed production implementations of both

mod manifest;
mod versions;

pub use manifest::{parse_manifest, DeclaredEntry, ManifestResolver};
pub use versions::{extract_versions, CommandVersionSource};

use crate::command::CancelSignal;
use crate::config::{ProjectConfig, RuleConfig, RunConfig};
use crate::domain::Package;
use crate::error::AppError;
use async_trait::async_trait;

/// Resolves the packages declared by every configured rule
#[async_trait]
pub trait PackageResolver: Send + Sync {
    /// Returns packages for all rules selected by the run filter
    async fn resolve(
        &self,
        config: &ProjectConfig,
        run: &RunConfig,
        cancel: &CancelSignal,
    ) -> Result<Vec<Package>, AppError>;
}

/// Lists versions available for a package
///
/// An `AppError::Unsupported` means the rule cannot look versions up and is
/// reported per package without failing the run.
#[async_trait]
pub trait VersionSource: Send + Sync {
    /// Returns versions newer than the package's current version, ascending
    async fn available_versions(
        &self,
        package: &Package,
        rule: &RuleConfig,
        run: &RunConfig,
        cancel: &CancelSignal,
    ) -> Result<Vec<String>, AppError>;
}
