//! Resolved package information

use super::{is_floating_version, ConstraintKind};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Dependency classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageType {
    /// Runtime dependency
    Prod,
    /// Development-only dependency
    Dev,
}

impl PackageType {
    /// Returns the lowercase name used in config files and output
    pub fn as_str(&self) -> &'static str {
        match self {
            PackageType::Prod => "prod",
            PackageType::Dev => "dev",
        }
    }
}

impl fmt::Display for PackageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Installation state found while resolving a package
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallStatus {
    /// Installed version read from the lock data
    LockFound,
    /// The rule expects a lock file but none exists
    LockMissing,
    /// Lock data exists but does not mention the package
    NotInLock,
    /// The package declares no version
    VersionMissing,
    /// The rule has no lock configuration
    NotConfigured,
    /// Declared version floats (`*`, `latest`)
    Floating,
    /// Ignored by rule configuration
    Ignored,
}

impl fmt::Display for InstallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            InstallStatus::LockFound => "lock found",
            InstallStatus::LockMissing => "lock missing",
            InstallStatus::NotInLock => "not in lock",
            InstallStatus::VersionMissing => "version missing",
            InstallStatus::NotConfigured => "not configured",
            InstallStatus::Floating => "floating",
            InstallStatus::Ignored => "ignored",
        };
        f.write_str(s)
    }
}

/// A dependency resolved from a manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    /// Rule (ecosystem configuration) key, e.g. `npm`
    pub rule: String,
    /// Package name
    pub name: String,
    /// Production or development dependency
    pub package_type: PackageType,
    /// Package manager id
    pub package_manager: String,
    /// Declared constraint operator (`^`, `~`, `>=`, ... or empty)
    pub constraint: String,
    /// Declared version without operator
    pub version: String,
    /// Installed version from lock data, if known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub installed_version: Option<String>,
    /// Install status
    pub status: InstallStatus,
    /// Explicit group assignment
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    /// Manifest file declaring the package
    pub manifest_path: PathBuf,
}

impl Package {
    /// Creates a new production package for a rule
    pub fn new(
        rule: impl Into<String>,
        name: impl Into<String>,
        constraint: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        let rule = rule.into();
        Self {
            package_manager: rule.clone(),
            rule,
            name: name.into(),
            package_type: PackageType::Prod,
            constraint: constraint.into(),
            version: version.into(),
            installed_version: None,
            status: InstallStatus::NotConfigured,
            group: None,
            manifest_path: PathBuf::new(),
        }
    }

    /// Sets the package type (builder pattern)
    pub fn with_type(mut self, package_type: PackageType) -> Self {
        self.package_type = package_type;
        self
    }

    /// Sets the package manager id (builder pattern)
    pub fn with_package_manager(mut self, pm: impl Into<String>) -> Self {
        self.package_manager = pm.into();
        self
    }

    /// Sets the installed version and marks it as found in the lock (builder pattern)
    pub fn with_installed(mut self, version: impl Into<String>) -> Self {
        self.installed_version = Some(version.into());
        self.status = InstallStatus::LockFound;
        self
    }

    /// Sets the install status (builder pattern)
    pub fn with_status(mut self, status: InstallStatus) -> Self {
        self.status = status;
        self
    }

    /// Sets the group (builder pattern)
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Sets the manifest path (builder pattern)
    pub fn with_manifest(mut self, path: impl Into<PathBuf>) -> Self {
        self.manifest_path = path.into();
        self
    }

    /// Returns the constraint kind
    pub fn constraint_kind(&self) -> ConstraintKind {
        ConstraintKind::classify(&self.constraint, &self.version)
    }

    /// Returns true if the declared requirement floats
    pub fn is_floating(&self) -> bool {
        self.status == InstallStatus::Floating || is_floating_version(&self.version)
    }

    /// Version the selector compares against: installed when known, else declared
    pub fn current_version(&self) -> &str {
        match self.installed_version.as_deref().map(str::trim) {
            Some(installed) if !installed.is_empty() => installed,
            _ => self.version.trim(),
        }
    }
}

impl fmt::Display for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}/{})",
            self.name, self.package_type, self.rule
        )
    }
}
