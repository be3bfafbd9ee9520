//! Update planning: grouping, ordering and target selection

use super::selector::{Selection, VersionScopeSelector};
use crate::command::{validate_template, CancelSignal};
use crate::config::{is_incremental, ProjectConfig, RuleConfig, RunConfig};
use crate::domain::{
    ExecutionUnit, FailureKind, InstallStatus, Package, PackageResult, PlannedAction,
};
use crate::error::{AppError, ConfigError};
use crate::resolver::VersionSource;
use std::cmp::Ordering;
use tracing::{debug, warn};

/// Outcome of planning
#[derive(Debug, Clone, Default)]
pub struct Plan {
    /// Units to execute, in order
    pub units: Vec<ExecutionUnit>,
    /// Packages settled during planning (up to date, unsupported, skipped, failed)
    pub results: Vec<PackageResult>,
}

impl Plan {
    /// Number of planned package updates
    pub fn action_count(&self) -> usize {
        self.units.iter().map(|u| u.actions.len()).sum()
    }

    /// Returns true if nothing needs updating
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

/// A package with its resolved group
struct Candidate {
    package: Package,
    group: Option<String>,
    with_all_dependencies: bool,
}

/// Builds execution units from resolved packages
pub struct UpdatePlanner<'a> {
    config: &'a ProjectConfig,
    run: &'a RunConfig,
    versions: &'a dyn VersionSource,
    selector: VersionScopeSelector,
}

impl<'a> UpdatePlanner<'a> {
    /// Creates a planner for one run
    pub fn new(
        config: &'a ProjectConfig,
        run: &'a RunConfig,
        versions: &'a dyn VersionSource,
    ) -> Self {
        Self {
            config,
            run,
            versions,
            selector: VersionScopeSelector::new(run.scope),
        }
    }

    /// Plans updates for the resolved packages
    ///
    /// Packages rejected by the run filter are dropped. Every other package
    /// ends up either in exactly one unit or in `Plan::results`.
    pub async fn plan(&self, packages: Vec<Package>, cancel: &CancelSignal) -> Plan {
        let mut plan = Plan::default();
        let mut candidates = Vec::new();

        for package in packages {
            let Some(rule) = self.config.rule(&package.rule) else {
                let message = format!("rule '{}' is not configured", package.rule);
                plan.results
                    .push(PackageResult::failed(package, FailureKind::Config, message));
                continue;
            };
            match resolve_group(&package, rule) {
                Ok((group, with_all_dependencies)) => {
                    if !self.run.filter.matches(&package, group.as_deref()) {
                        continue;
                    }
                    let package = match &group {
                        Some(group) => package.with_group(group.clone()),
                        None => package,
                    };
                    candidates.push(Candidate {
                        package,
                        group,
                        with_all_dependencies,
                    });
                }
                Err(e) => {
                    plan.results.push(PackageResult::failed(
                        package,
                        FailureKind::Config,
                        e.to_string(),
                    ));
                }
            }
        }

        candidates.sort_by(compare_candidates);

        let mut planned: Vec<(String, Option<String>, PlannedAction)> = Vec::new();
        for candidate in candidates {
            if cancel.is_cancelled() {
                plan.results
                    .push(PackageResult::skipped(candidate.package, "cancelled"));
                continue;
            }
            // Rule presence was checked above
            let Some(rule) = self.config.rule(&candidate.package.rule) else {
                continue;
            };
            match self.decide(&candidate, rule, cancel).await {
                Decision::Update(target) => {
                    let key = candidate
                        .group
                        .clone()
                        .unwrap_or_else(|| candidate.package.name.clone());
                    let action = PlannedAction::new(candidate.package, target)
                        .with_skip_lock(self.run.skip_lock)
                        .with_dry_run(self.run.dry_run)
                        .with_all_dependencies(candidate.with_all_dependencies);
                    planned.push((key, candidate.group, action));
                }
                Decision::Settled(result) => plan.results.push(*result),
            }
        }

        // A group may span package types, so units are matched by key rather than adjacency
        for (key, group, action) in planned {
            let existing = plan.units.iter().position(|unit| {
                unit.key == key
                    && unit.group == group
                    && unit.rule() == Some(action.package.rule.as_str())
            });
            let index = match existing {
                Some(index) => index,
                None => {
                    plan.units.push(ExecutionUnit::new(key, group));
                    plan.units.len() - 1
                }
            };
            plan.units[index].actions.push(action);
        }

        debug!(
            units = plan.units.len(),
            actions = plan.action_count(),
            settled = plan.results.len(),
            "planning finished"
        );
        plan
    }

    async fn decide(
        &self,
        candidate: &Candidate,
        rule: &RuleConfig,
        cancel: &CancelSignal,
    ) -> Decision {
        let package = &candidate.package;

        if package.status == InstallStatus::Ignored || rule.is_ignored(&package.name) {
            return Decision::settled(PackageResult::skipped(
                package.clone(),
                "ignored by configuration",
            ));
        }

        let Some(update) = rule
            .update
            .as_ref()
            .filter(|u| !u.commands.trim().is_empty())
        else {
            return Decision::settled(PackageResult::unsupported(
                package.clone(),
                "no commands configured",
            ));
        };

        let mut templates = vec![update.commands.as_str()];
        if !self.run.skip_lock && !update.lock_commands.trim().is_empty() {
            templates.push(update.lock_commands.as_str());
        }
        for template in templates {
            if let Err(e) = validate_template(template) {
                return Decision::config_failure(package, e);
            }
        }

        if let Some(selection) = self.selector.precheck(package) {
            return Decision::from_selection(package, selection);
        }

        let incremental = match is_incremental(
            &package.name,
            &rule.incremental,
            &self.config.incremental,
        ) {
            Ok(matched) => self.run.scope.incremental || matched,
            Err(e) => return Decision::config_failure(package, e),
        };

        let available = match self
            .versions
            .available_versions(package, rule, self.run, cancel)
            .await
        {
            Ok(versions) => versions,
            Err(AppError::Unsupported(e)) => {
                return Decision::settled(PackageResult::unsupported(package.clone(), e.reason));
            }
            Err(AppError::Config(e)) => return Decision::config_failure(package, e),
            Err(e) => {
                warn!(package = %package.name, error = %e, "version lookup failed");
                return Decision::settled(PackageResult::failed(
                    package.clone(),
                    FailureKind::Execution,
                    e.to_string(),
                ));
            }
        };

        let exclude = rule
            .outdated
            .as_ref()
            .map(|o| o.exclude_versions.as_slice())
            .unwrap_or_default();
        let selection = self.selector.select(package, &available, incremental, exclude);
        Decision::from_selection(package, selection)
    }
}

enum Decision {
    Update(String),
    Settled(Box<PackageResult>),
}

impl Decision {
    fn settled(result: PackageResult) -> Self {
        Decision::Settled(Box::new(result))
    }

    fn config_failure(package: &Package, error: ConfigError) -> Self {
        Decision::settled(PackageResult::failed(
            package.clone(),
            FailureKind::Config,
            error.to_string(),
        ))
    }

    fn from_selection(package: &Package, selection: Selection) -> Self {
        match selection {
            Selection::Target(target) => Decision::Update(target),
            Selection::UpToDate => Decision::settled(PackageResult::up_to_date(package.clone())),
            Selection::Unsupported(reason) => {
                Decision::settled(PackageResult::unsupported(package.clone(), reason))
            }
        }
    }
}

/// Resolves a package's group and whether it updates with all dependencies
///
/// Order: the package's own group, a named group listing it, the rule's
/// group template, or none.
pub fn resolve_group(
    package: &Package,
    rule: &RuleConfig,
) -> Result<(Option<String>, bool), ConfigError> {
    if let Some(group) = package.group.as_ref().filter(|g| !g.trim().is_empty()) {
        let with_all = rule
            .groups
            .get(group)
            .is_some_and(|g| g.with_all_dependencies);
        return Ok((Some(group.clone()), with_all));
    }
    if let Some((name, group)) = rule.group_of(&package.name) {
        return Ok((Some(name.to_string()), group.with_all_dependencies));
    }
    match rule.group.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        Some(template) => {
            let name = expand_group_template(template, package)?;
            Ok(((!name.is_empty()).then_some(name), false))
        }
        None => Ok((None, false)),
    }
}

fn expand_group_template(template: &str, package: &Package) -> Result<String, ConfigError> {
    let mut out = String::new();
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after
            .find("}}")
            .ok_or_else(|| ConfigError::invalid_template(template, "unterminated placeholder"))?;
        match after[..end].trim() {
            "package" => out.push_str(&package.name),
            "rule" => out.push_str(&package.rule),
            "type" => out.push_str(package.package_type.as_str()),
            other => {
                return Err(ConfigError::invalid_template(
                    template,
                    format!("unknown group placeholder '{}'", other),
                ))
            }
        }
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    Ok(out.trim().to_string())
}

/// Rule, then type, then group (named before ungrouped), then name
fn compare_candidates(a: &Candidate, b: &Candidate) -> Ordering {
    a.package
        .rule
        .cmp(&b.package.rule)
        .then(a.package.package_type.cmp(&b.package.package_type))
        .then_with(|| match (&a.group, &b.group) {
            (Some(x), Some(y)) => x.cmp(y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| a.package.name.cmp(&b.package.name))
}
