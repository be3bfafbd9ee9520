//! Target version selection within the active scope

use super::version::parse_version;
use crate::domain::{version_segments, Package, ScopeBound, ScopeLevel, UpdateScope};
use semver::Version;

/// Decision for one package
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Update to this version
    Target(String),
    /// Nothing newer within scope
    UpToDate,
    /// The package cannot be updated automatically
    Unsupported(String),
}

/// Picks a single target version for a package
#[derive(Debug, Clone, Copy, Default)]
pub struct VersionScopeSelector {
    scope: UpdateScope,
}

impl VersionScopeSelector {
    /// Creates a selector for a run scope
    pub fn new(scope: UpdateScope) -> Self {
        Self { scope }
    }

    /// Decides without looking at available versions, when possible
    ///
    /// Floating constraints, fully pinned exact versions and unusable
    /// reference versions never need a version lookup.
    pub fn precheck(&self, package: &Package) -> Option<Selection> {
        if package.is_floating() {
            return Some(Selection::Unsupported(format!(
                "floating constraint '{}' cannot be updated automatically; remove the constraint or update manually",
                package.version
            )));
        }

        if package.constraint_kind().is_exact() && version_segments(&package.version) == 3 {
            return Some(Selection::UpToDate);
        }

        let reference = package.current_version();
        if reference.trim().is_empty() {
            return Some(Selection::Unsupported(
                "no declared or installed version to compare against".to_string(),
            ));
        }
        if parse_version(reference).is_none() {
            return Some(Selection::Unsupported(format!(
                "version '{}' cannot be parsed",
                reference
            )));
        }
        None
    }

    /// Selects the target from the available versions
    pub fn select(
        &self,
        package: &Package,
        available: &[String],
        incremental: bool,
        exclude: &[String],
    ) -> Selection {
        if let Some(decision) = self.precheck(package) {
            return decision;
        }
        let Some(reference) = parse_version(package.current_version()) else {
            return Selection::Unsupported(format!(
                "version '{}' cannot be parsed",
                package.current_version()
            ));
        };

        let bound = self
            .scope
            .bound_for(package.constraint_kind(), version_segments(&package.version));
        let declared = parse_version(&package.version);
        let allow_prerelease = !reference.pre.is_empty();

        let candidates = available
            .iter()
            .filter(|raw| !exclude.iter().any(|e| e.trim() == raw.trim()))
            .filter_map(|raw| parse_version(raw).map(|v| (v, raw)))
            .filter(|(v, _)| v.cmp_precedence(&reference).is_gt())
            .filter(|(v, _)| allow_prerelease || v.pre.is_empty())
            .filter(|(v, _)| within_bound(bound, &reference, declared.as_ref(), v));

        let chosen = if incremental {
            candidates.min_by(|(a, _), (b, _)| a.cmp_precedence(b))
        } else {
            candidates.max_by(|(a, _), (b, _)| a.cmp_precedence(b))
        };

        match chosen {
            Some((_, raw)) => Selection::Target(raw.trim().to_string()),
            None => Selection::UpToDate,
        }
    }
}

fn within_bound(
    bound: ScopeBound,
    reference: &Version,
    declared: Option<&Version>,
    candidate: &Version,
) -> bool {
    match bound {
        ScopeBound::Level(ScopeLevel::Major) => true,
        ScopeBound::Level(ScopeLevel::Minor) => candidate.major == reference.major,
        ScopeBound::Level(ScopeLevel::Patch) => {
            candidate.major == reference.major && candidate.minor == reference.minor
        }
        ScopeBound::AtMost => declared.is_some_and(|d| candidate.cmp_precedence(d).is_le()),
        ScopeBound::Below => declared.is_some_and(|d| candidate.cmp_precedence(d).is_lt()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn versions(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn react() -> Package {
        Package::new("npm", "react", "^", "17.0.0").with_installed("17.0.0")
    }

    #[test]
    fn test_minor_scope_stays_in_major() {
        let selector = VersionScopeSelector::new(UpdateScope::new(ScopeLevel::Minor));
        let available = versions(&["17.0.1", "17.0.2", "18.0.0"]);
        assert_eq!(
            selector.select(&react(), &available, false, &[]),
            Selection::Target("17.0.2".to_string())
        );
    }

    #[test]
    fn test_major_scope_takes_newest() {
        let selector = VersionScopeSelector::new(UpdateScope::new(ScopeLevel::Major));
        let available = versions(&["17.0.1", "17.0.2", "18.0.0"]);
        assert_eq!(
            selector.select(&react(), &available, false, &[]),
            Selection::Target("18.0.0".to_string())
        );
    }

    #[test]
    fn test_patch_scope() {
        let selector = VersionScopeSelector::new(UpdateScope::new(ScopeLevel::Patch));
        let package = Package::new("npm", "lodash", "^", "4.17.0").with_installed("4.17.0");
        let available = versions(&["4.17.21", "4.18.0", "5.0.0"]);
        assert_eq!(
            selector.select(&package, &available, false, &[]),
            Selection::Target("4.17.21".to_string())
        );
    }

    #[test]
    fn test_scope_derived_from_constraint() {
        let selector = VersionScopeSelector::default();
        let available = versions(&["17.0.2", "18.0.0"]);
        // caret -> minor
        assert_eq!(
            selector.select(&react(), &available, false, &[]),
            Selection::Target("17.0.2".to_string())
        );
        // tilde -> patch
        let tilde = Package::new("npm", "x", "~", "1.2.0");
        let available = versions(&["1.2.5", "1.3.0"]);
        assert_eq!(
            selector.select(&tilde, &available, false, &[]),
            Selection::Target("1.2.5".to_string())
        );
        // >= -> major
        let ge = Package::new("pip", "requests", ">=", "2.28");
        let available = versions(&["2.31.0", "3.0.0"]);
        assert_eq!(
            selector.select(&ge, &available, false, &[]),
            Selection::Target("3.0.0".to_string())
        );
    }

    #[test]
    fn test_upper_bound_constraints_never_exceed_declared() {
        let selector = VersionScopeSelector::default();
        let available = versions(&["4.2.0", "4.2.5", "5.0.0"]);

        let at_most = Package::new("pip", "django", "<=", "4.2.0");
        assert_eq!(
            selector.select(&at_most, &available, false, &[]),
            Selection::UpToDate
        );

        // Installed below the bound may still move up to it
        let at_most = Package::new("pip", "django", "<=", "4.2.5").with_installed("4.1.0");
        assert_eq!(
            selector.select(&at_most, &available, false, &[]),
            Selection::Target("4.2.5".to_string())
        );

        let below = Package::new("pip", "django", "<", "5.0.0").with_installed("4.1.0");
        assert_eq!(
            selector.select(&below, &available, false, &[]),
            Selection::Target("4.2.5".to_string())
        );
    }

    #[test]
    fn test_partial_pin_keeps_declared_precision() {
        let selector = VersionScopeSelector::default();

        let minor_pin = Package::new("composer", "monolog/monolog", "", "2.9");
        let available = versions(&["2.9.3", "2.10.0", "3.5.0"]);
        assert_eq!(
            selector.select(&minor_pin, &available, false, &[]),
            Selection::Target("2.9.3".to_string())
        );

        let major_pin = Package::new("composer", "monolog/monolog", "=", "2");
        assert_eq!(
            selector.select(&major_pin, &available, false, &[]),
            Selection::Target("2.10.0".to_string())
        );
    }

    #[test]
    fn test_explicit_scope_overrides_upper_bound() {
        let selector = VersionScopeSelector::new(UpdateScope::new(ScopeLevel::Major));
        let package = Package::new("pip", "django", "<=", "4.2.0");
        assert_eq!(
            selector.select(&package, &versions(&["4.2.5", "5.0.0"]), false, &[]),
            Selection::Target("5.0.0".to_string())
        );
    }

    #[test]
    fn test_incremental_takes_smallest_newer() {
        let selector = VersionScopeSelector::new(UpdateScope::new(ScopeLevel::Major));
        let available = versions(&["18.0.0", "17.0.2", "17.0.1"]);
        assert_eq!(
            selector.select(&react(), &available, true, &[]),
            Selection::Target("17.0.1".to_string())
        );
    }

    #[test]
    fn test_installed_version_is_reference() {
        let selector = VersionScopeSelector::new(UpdateScope::new(ScopeLevel::Minor));
        let package = Package::new("npm", "react", "^", "17.0.0").with_installed("17.0.2");
        let available = versions(&["17.0.1", "17.0.2"]);
        assert_eq!(
            selector.select(&package, &available, false, &[]),
            Selection::UpToDate
        );
    }

    #[test]
    fn test_nothing_newer_is_up_to_date() {
        let selector = VersionScopeSelector::default();
        assert_eq!(
            selector.select(&react(), &[], false, &[]),
            Selection::UpToDate
        );
        let available = versions(&["16.0.0", "17.0.0"]);
        assert_eq!(
            selector.select(&react(), &available, false, &[]),
            Selection::UpToDate
        );
    }

    #[test]
    fn test_floating_is_unsupported() {
        let selector = VersionScopeSelector::default();
        let package = Package::new("npm", "left-pad", "", "*");
        match selector.select(&package, &versions(&["1.0.0"]), false, &[]) {
            Selection::Unsupported(reason) => {
                assert!(reason.contains("floating constraint '*'"));
                assert!(reason.contains("remove the constraint or update manually"));
            }
            other => panic!("unexpected selection: {other:?}"),
        }
    }

    #[test]
    fn test_exact_pin_is_up_to_date_without_lookup() {
        let selector = VersionScopeSelector::default();
        let package = Package::new("composer", "monolog/monolog", "", "2.9.1");
        assert_eq!(selector.precheck(&package), Some(Selection::UpToDate));

        // Not fully pinned: still looked up
        let package = Package::new("composer", "monolog/monolog", "", "2.9");
        assert_eq!(selector.precheck(&package), None);
    }

    #[test]
    fn test_unparseable_reference() {
        let selector = VersionScopeSelector::default();
        let package = Package::new("composer", "foo/bar", "", "dev-master");
        assert!(matches!(
            selector.precheck(&package),
            Some(Selection::Unsupported(_))
        ));
    }

    #[test]
    fn test_prerelease_candidates_ignored_for_stable() {
        let selector = VersionScopeSelector::new(UpdateScope::new(ScopeLevel::Major));
        let available = versions(&["17.0.2", "19.0.0-canary-1", "18.0.0-rc.1"]);
        assert_eq!(
            selector.select(&react(), &available, false, &[]),
            Selection::Target("17.0.2".to_string())
        );
    }

    #[test]
    fn test_prerelease_reference_allows_prerelease() {
        let selector = VersionScopeSelector::new(UpdateScope::new(ScopeLevel::Major));
        let package = Package::new("npm", "next", "^", "14.0.0-canary.1");
        let available = versions(&["14.0.0-canary.5"]);
        assert_eq!(
            selector.select(&package, &available, false, &[]),
            Selection::Target("14.0.0-canary.5".to_string())
        );
    }

    #[test]
    fn test_excluded_versions() {
        let selector = VersionScopeSelector::new(UpdateScope::new(ScopeLevel::Minor));
        let available = versions(&["17.0.1", "17.0.2"]);
        assert_eq!(
            selector.select(&react(), &available, false, &versions(&["17.0.2"])),
            Selection::Target("17.0.1".to_string())
        );
    }
}
