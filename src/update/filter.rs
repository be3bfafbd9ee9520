//! Package filter configuration
//!
//! This module provides the PackageFilter struct that encapsulates
//! the `--rule`, `--type`, `--package-manager`, `--name` and `--group`
//! selections applied before planning.

use crate::domain::{Package, PackageType};

/// Filter applied to resolved packages
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageFilter {
    /// Rules to process (empty means all)
    pub rules: Vec<String>,
    /// Package types to process (empty means all)
    pub types: Vec<PackageType>,
    /// Package managers to process (empty means all)
    pub package_managers: Vec<String>,
    /// Package names to process (empty means all)
    pub names: Vec<String>,
    /// Groups to process (empty means all)
    pub groups: Vec<String>,
}

impl PackageFilter {
    /// Create a new PackageFilter with default settings (process all)
    pub fn new() -> Self {
        Self::default()
    }

    /// Set rules to process
    pub fn with_rules(mut self, rules: Vec<String>) -> Self {
        self.rules = rules;
        self
    }

    /// Set package types to process
    pub fn with_types(mut self, types: Vec<PackageType>) -> Self {
        self.types = types;
        self
    }

    /// Set package managers to process
    pub fn with_package_managers(mut self, managers: Vec<String>) -> Self {
        self.package_managers = managers;
        self
    }

    /// Set package names to process
    pub fn with_names(mut self, names: Vec<String>) -> Self {
        self.names = names;
        self
    }

    /// Set groups to process
    pub fn with_groups(mut self, groups: Vec<String>) -> Self {
        self.groups = groups;
        self
    }

    /// Returns true if no filter is set
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
            && self.types.is_empty()
            && self.package_managers.is_empty()
            && self.names.is_empty()
            && self.groups.is_empty()
    }

    /// Check if a rule should be processed
    pub fn should_process_rule(&self, rule: &str) -> bool {
        self.rules.is_empty() || self.rules.iter().any(|r| r == rule)
    }

    /// Check if a package passes the filter
    ///
    /// `group` is the group the planner resolved for the package, which may
    /// come from configuration rather than the package itself.
    pub fn matches(&self, package: &Package, group: Option<&str>) -> bool {
        if !self.should_process_rule(&package.rule) {
            return false;
        }
        if !self.types.is_empty() && !self.types.contains(&package.package_type) {
            return false;
        }
        if !self.package_managers.is_empty()
            && !self.package_managers.iter().any(|pm| pm == &package.package_manager)
        {
            return false;
        }
        if !self.names.is_empty() && !self.names.iter().any(|n| n == &package.name) {
            return false;
        }
        if !self.groups.is_empty() {
            return match group {
                Some(group) => self.groups.iter().any(|g| g == group),
                None => false,
            };
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pkg(rule: &str, name: &str) -> Package {
        Package::new(rule, name, "^", "1.0.0")
    }

    #[test]
    fn test_empty_filter_matches_all() {
        let filter = PackageFilter::new();
        assert!(filter.is_empty());
        assert!(filter.matches(&pkg("npm", "react"), None));
        assert!(filter.should_process_rule("composer"));
    }

    #[test]
    fn test_rule_filter() {
        let filter = PackageFilter::new().with_rules(vec!["npm".to_string()]);
        assert!(filter.matches(&pkg("npm", "react"), None));
        assert!(!filter.matches(&pkg("composer", "laravel/framework"), None));
        assert!(!filter.should_process_rule("composer"));
    }

    #[test]
    fn test_type_filter() {
        let filter = PackageFilter::new().with_types(vec![PackageType::Dev]);
        assert!(!filter.matches(&pkg("npm", "react"), None));
        assert!(filter.matches(&pkg("npm", "jest").with_type(PackageType::Dev), None));
    }

    #[test]
    fn test_package_manager_filter() {
        let filter = PackageFilter::new().with_package_managers(vec!["pnpm".to_string()]);
        assert!(!filter.matches(&pkg("npm", "react"), None));
        assert!(filter.matches(&pkg("npm", "react").with_package_manager("pnpm"), None));
    }

    #[test]
    fn test_name_filter() {
        let filter = PackageFilter::new().with_names(vec!["react".to_string()]);
        assert!(filter.matches(&pkg("npm", "react"), None));
        assert!(!filter.matches(&pkg("npm", "lodash"), None));
    }

    #[test]
    fn test_group_filter_uses_resolved_group() {
        let filter = PackageFilter::new().with_groups(vec!["ui".to_string()]);
        assert!(filter.matches(&pkg("npm", "react"), Some("ui")));
        assert!(!filter.matches(&pkg("npm", "react"), Some("backend")));
        assert!(!filter.matches(&pkg("npm", "react"), None));
    }
}
