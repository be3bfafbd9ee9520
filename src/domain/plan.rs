//! Planned update actions and execution units

use super::Package;
use serde::{Deserialize, Serialize};

/// One package update decided by the planner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedAction {
    /// Package to update
    pub package: Package,
    /// Version selected by the scope selector
    pub target: String,
    /// Do not run the lock command
    pub skip_lock: bool,
    /// Do not run any command
    pub dry_run: bool,
    /// Pass the "with all dependencies" flag to the update command
    pub with_all_dependencies: bool,
}

impl PlannedAction {
    /// Creates a new action
    pub fn new(package: Package, target: impl Into<String>) -> Self {
        Self {
            package,
            target: target.into(),
            skip_lock: false,
            dry_run: false,
            with_all_dependencies: false,
        }
    }

    /// Sets the skip-lock flag (builder pattern)
    pub fn with_skip_lock(mut self, skip_lock: bool) -> Self {
        self.skip_lock = skip_lock;
        self
    }

    /// Sets the dry-run flag (builder pattern)
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Sets the with-all-dependencies flag (builder pattern)
    pub fn with_all_dependencies(mut self, enabled: bool) -> Self {
        self.with_all_dependencies = enabled;
        self
    }
}

/// Packages updated and validated together
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionUnit {
    /// Unit key: group name, or package name for singleton units
    pub key: String,
    /// Display group, `None` for ungrouped packages
    pub group: Option<String>,
    /// Actions in execution order
    pub actions: Vec<PlannedAction>,
}

impl ExecutionUnit {
    /// Creates an empty unit
    pub fn new(key: impl Into<String>, group: Option<String>) -> Self {
        Self {
            key: key.into(),
            group,
            actions: Vec::new(),
        }
    }

    /// Returns true when the unit holds more than one package
    pub fn is_group(&self) -> bool {
        self.actions.len() > 1
    }

    /// Returns the rule of the first action
    pub fn rule(&self) -> Option<&str> {
        self.actions.first().map(|a| a.package.rule.as_str())
    }

    /// Returns the package names in this unit
    pub fn package_names(&self) -> Vec<&str> {
        self.actions.iter().map(|a| a.package.name.as_str()).collect()
    }

    /// Returns a label for logs and messages
    pub fn label(&self) -> String {
        match &self.group {
            Some(group) if self.is_group() => format!("group '{}'", group),
            _ => self.key.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_label() {
        let mut unit = ExecutionUnit::new("react", None);
        unit.actions
            .push(PlannedAction::new(Package::new("npm", "react", "^", "17.0.0"), "17.0.2"));
        assert!(!unit.is_group());
        assert_eq!(unit.label(), "react");
        assert_eq!(unit.rule(), Some("npm"));

        let mut group = ExecutionUnit::new("ui", Some("ui".to_string()));
        group
            .actions
            .push(PlannedAction::new(Package::new("npm", "react", "^", "17.0.0"), "17.0.2"));
        group
            .actions
            .push(PlannedAction::new(Package::new("npm", "react-dom", "^", "17.0.0"), "17.0.2"));
        assert!(group.is_group());
        assert_eq!(group.label(), "group 'ui'");
        assert_eq!(group.package_names(), vec!["react", "react-dom"]);
    }

    #[test]
    fn test_action_builders() {
        let action = PlannedAction::new(Package::new("npm", "react", "^", "17.0.0"), "18.0.0")
            .with_skip_lock(true)
            .with_dry_run(true)
            .with_all_dependencies(true);
        assert!(action.skip_lock);
        assert!(action.dry_run);
        assert!(action.with_all_dependencies);
    }
}
