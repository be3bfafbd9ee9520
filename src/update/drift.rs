//! Drift checks against re-resolved packages
//!
//! After a unit's commands succeed, the manifests are resolved again and every
//! updated package must declare its target version. When lock data records an
//! installed version, that must match as well. After a restore the declared
//! version must be back to what was planned from.

use crate::domain::{Package, PlannedAction};
use crate::error::DriftError;
use crate::update::compare_versions;
use std::cmp::Ordering;

fn same_version(a: &str, b: &str) -> bool {
    compare_versions(a, b) == Ordering::Equal
}

fn find<'p>(package: &Package, reloaded: &'p [Package]) -> Option<&'p Package> {
    reloaded.iter().find(|p| {
        p.rule == package.rule && p.name == package.name && p.package_type == package.package_type
    })
}

/// Checks that an applied action is visible in the reloaded packages
pub fn check_updated(action: &PlannedAction, reloaded: &[Package]) -> Result<(), DriftError> {
    let found = find(&action.package, reloaded).ok_or_else(|| DriftError::Missing {
        package: action.package.to_string(),
    })?;
    if !same_version(&found.version, &action.target) {
        return Err(DriftError::Declared {
            expected: action.target.clone(),
            found: found.version.clone(),
        });
    }
    match found.installed_version.as_deref() {
        Some(installed) if !same_version(installed, &action.target) => {
            Err(DriftError::Installed {
                expected: action.target.clone(),
                found: installed.to_string(),
            })
        }
        _ => Ok(()),
    }
}

/// Checks that a restored action declares its original version again
pub fn check_restored(action: &PlannedAction, reloaded: &[Package]) -> Result<(), DriftError> {
    let expected = &action.package.version;
    match find(&action.package, reloaded) {
        Some(found) if same_version(&found.version, expected) => Ok(()),
        found => Err(DriftError::NotRestored {
            package: action.package.name.clone(),
            expected: expected.clone(),
            found: found.map_or_else(|| "nothing".to_string(), |p| p.version.clone()),
        }),
    }
}
