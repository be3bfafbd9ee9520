//! Update command execution for one unit

use crate::command::{render_template, CancelSignal, CommandRequest, CommandRunner, TemplateVars};
use crate::config::{ProjectConfig, RunConfig, UpdateConfig, DEFAULT_COMMAND_TIMEOUT_SECS};
use crate::domain::{ExecutionUnit, FailureKind, PackageResult, PlannedAction};
use crate::error::AppError;
use tracing::{debug, info, warn};

/// Result of executing one unit
#[derive(Debug, Clone, Default)]
pub struct UnitOutcome {
    /// One result per action, in unit order
    pub results: Vec<PackageResult>,
    /// A command failed; the unit must be restored
    pub failed: bool,
    /// The failure was a cancellation
    pub cancelled: bool,
}

/// Runs update and lock commands for planned actions
pub struct UpdateExecutor<'a> {
    runner: &'a dyn CommandRunner,
    config: &'a ProjectConfig,
    run: &'a RunConfig,
}

impl<'a> UpdateExecutor<'a> {
    /// Creates an executor for one run
    pub fn new(
        runner: &'a dyn CommandRunner,
        config: &'a ProjectConfig,
        run: &'a RunConfig,
    ) -> Self {
        Self {
            runner,
            config,
            run,
        }
    }

    /// Executes every action of a unit
    ///
    /// Multi-package units skip the per-package lock step and run the lock
    /// command once after all update commands. A failure fails the whole unit.
    pub async fn execute(&self, unit: &ExecutionUnit, cancel: &CancelSignal) -> UnitOutcome {
        if self.run.dry_run || unit.actions.iter().all(|a| a.dry_run) {
            return UnitOutcome {
                results: unit
                    .actions
                    .iter()
                    .map(|a| PackageResult::planned(a.package.clone(), &a.target))
                    .collect(),
                ..Default::default()
            };
        }

        let Some(update) = unit
            .rule()
            .and_then(|rule| self.config.rule(rule))
            .and_then(|rule| rule.update.as_ref())
        else {
            let results = unit
                .actions
                .iter()
                .map(|a| {
                    PackageResult::failed(
                        a.package.clone(),
                        FailureKind::Config,
                        "no update configuration for rule",
                    )
                })
                .collect();
            return UnitOutcome {
                results,
                failed: true,
                cancelled: false,
            };
        };

        info!(unit = %unit.label(), packages = unit.actions.len(), "updating");

        for (index, action) in unit.actions.iter().enumerate() {
            let per_package_lock = !unit.is_group() && !action.skip_lock;
            if let Err(e) = self.apply(action, update, per_package_lock, cancel).await {
                warn!(package = %action.package.name, error = %e, "update failed");
                return fail_unit(unit, Some(index), e);
            }
        }

        let group_lock = unit.is_group() && unit.actions.iter().all(|a| !a.skip_lock);
        if group_lock {
            if let Some(first) = unit.actions.first() {
                let vars = TemplateVars {
                    rule: &first.package.rule,
                    package_type: first.package.package_type.as_str(),
                    with_all_deps: first.with_all_dependencies,
                    ..Default::default()
                };
                if let Err(e) = self.run_lock(update, &vars, cancel).await {
                    warn!(unit = %unit.label(), error = %e, "lock command failed");
                    return fail_unit(unit, None, e);
                }
            }
        }

        UnitOutcome {
            results: unit
                .actions
                .iter()
                .map(|a| PackageResult::updated(a.package.clone(), &a.target))
                .collect(),
            ..Default::default()
        }
    }

    async fn apply(
        &self,
        action: &PlannedAction,
        update: &UpdateConfig,
        lock: bool,
        cancel: &CancelSignal,
    ) -> Result<(), AppError> {
        let package = &action.package;
        let vars = TemplateVars {
            package: &package.name,
            version: &action.target,
            constraint: &package.constraint,
            package_type: package.package_type.as_str(),
            rule: &package.rule,
            with_all_deps: action.with_all_dependencies,
        };
        let script = render_template(&update.commands, &vars)?;
        debug!(package = %package.name, target = %action.target, "running update command");
        self.runner.run(&self.request(script, update), cancel).await?;

        if lock {
            self.run_lock(update, &vars, cancel).await?;
        }
        Ok(())
    }

    async fn run_lock(
        &self,
        update: &UpdateConfig,
        vars: &TemplateVars<'_>,
        cancel: &CancelSignal,
    ) -> Result<(), AppError> {
        if update.lock_commands.trim().is_empty() {
            return Ok(());
        }
        let script = render_template(&update.lock_commands, vars)?;
        debug!(script = %script, "running lock command");
        self.runner.run(&self.request(script, update), cancel).await?;
        Ok(())
    }

    fn request(&self, script: String, update: &UpdateConfig) -> CommandRequest {
        CommandRequest::new(script, &self.run.working_dir)
            .with_env(update.env.clone())
            .with_timeout(
                self.run
                    .timeout(update.timeout_seconds, DEFAULT_COMMAND_TIMEOUT_SECS),
            )
    }
}

/// Marks every package of a failed unit as failed
///
/// `failing` is the action whose command failed; `None` means the shared
/// lock step failed.
fn fail_unit(unit: &ExecutionUnit, failing: Option<usize>, error: AppError) -> UnitOutcome {
    let cancelled = matches!(&error, AppError::Command(e) if e.is_cancelled());
    let kind = match &error {
        AppError::Config(_) => FailureKind::Config,
        _ => FailureKind::Execution,
    };
    let culprit = failing
        .and_then(|i| unit.actions.get(i))
        .map(|a| a.package.name.clone());

    let results = unit
        .actions
        .iter()
        .enumerate()
        .map(|(i, action)| {
            let message = if Some(i) == failing || failing.is_none() {
                error.to_string()
            } else {
                format!(
                    "{} rolled back because {} failed",
                    unit.label(),
                    culprit.as_deref().unwrap_or("another package")
                )
            };
            PackageResult::failed(action.package.clone(), kind, message)
                .with_target(&action.target)
        })
        .collect();

    UnitOutcome {
        results,
        failed: true,
        cancelled,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandOutput;
    use crate::domain::{Outcome, Package};
    use crate::error::CommandError;
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::Mutex;

    /// Records scripts and fails those containing a marker
    struct RecordingRunner {
        fail_marker: Option<&'static str>,
        scripts: Mutex<Vec<String>>,
    }

    impl RecordingRunner {
        fn new(fail_marker: Option<&'static str>) -> Self {
            Self {
                fail_marker,
                scripts: Mutex::new(Vec::new()),
            }
        }

        fn scripts(&self) -> Vec<String> {
            self.scripts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CommandRunner for RecordingRunner {
        async fn run(
            &self,
            request: &CommandRequest,
            _cancel: &CancelSignal,
        ) -> Result<CommandOutput, CommandError> {
            self.scripts.lock().unwrap().push(request.script.clone());
            match self.fail_marker {
                Some(marker) if request.script.contains(marker) => Err(CommandError::failed(
                    &request.script,
                    Some(1),
                    "",
                    "npm ERR! boom",
                )),
                _ => Ok(CommandOutput::default()),
            }
        }
    }

    fn config() -> ProjectConfig {
        ProjectConfig::parse(
            r#"
[rules.npm]
manifest = "package.json"

[rules.npm.update]
commands = "npm install {{package}}@{{version}}"
lock_commands = "npm install --package-lock-only"
"#,
            Path::new("depshift.toml"),
        )
        .unwrap()
    }

    fn unit(names: &[&str]) -> ExecutionUnit {
        let group = (names.len() > 1).then(|| "ui".to_string());
        let key = group.clone().unwrap_or_else(|| names[0].to_string());
        let mut unit = ExecutionUnit::new(key, group);
        for name in names {
            unit.actions.push(PlannedAction::new(
                Package::new("npm", *name, "^", "17.0.0"),
                "17.0.2",
            ));
        }
        unit
    }

    #[tokio::test]
    async fn test_single_package_runs_update_then_lock() {
        let runner = RecordingRunner::new(None);
        let config = config();
        let run = RunConfig::new(".");
        let executor = UpdateExecutor::new(&runner, &config, &run);

        let outcome = executor.execute(&unit(&["react"]), &CancelSignal::never()).await;
        assert!(!outcome.failed);
        assert_eq!(outcome.results[0].outcome, Outcome::Updated);
        assert_eq!(
            runner.scripts(),
            vec![
                "npm install react@17.0.2".to_string(),
                "npm install --package-lock-only".to_string()
            ]
        );
    }

    #[tokio::test]
    async fn test_skip_lock() {
        let runner = RecordingRunner::new(None);
        let config = config();
        let run = RunConfig::new(".");
        let executor = UpdateExecutor::new(&runner, &config, &run);
        let mut unit = unit(&["react"]);
        unit.actions[0].skip_lock = true;

        executor.execute(&unit, &CancelSignal::never()).await;
        assert_eq!(runner.scripts(), vec!["npm install react@17.0.2".to_string()]);
    }

    #[tokio::test]
    async fn test_group_runs_lock_once() {
        let runner = RecordingRunner::new(None);
        let config = config();
        let run = RunConfig::new(".");
        let executor = UpdateExecutor::new(&runner, &config, &run);

        let outcome = executor
            .execute(&unit(&["react", "react-dom"]), &CancelSignal::never())
            .await;
        assert!(!outcome.failed);
        assert_eq!(
            runner.scripts(),
            vec![
                "npm install react@17.0.2".to_string(),
                "npm install react-dom@17.0.2".to_string(),
                "npm install --package-lock-only".to_string()
            ]
        );
    }

    #[tokio::test]
    async fn test_failure_fails_whole_unit() {
        let runner = RecordingRunner::new(Some("react-dom"));
        let config = config();
        let run = RunConfig::new(".");
        let executor = UpdateExecutor::new(&runner, &config, &run);

        let outcome = executor
            .execute(&unit(&["react", "react-dom", "scheduler"]), &CancelSignal::never())
            .await;
        assert!(outcome.failed);
        assert!(!outcome.cancelled);
        assert!(outcome.results.iter().all(|r| r.outcome == Outcome::Failed));
        assert!(outcome.results[1]
            .reason
            .as_deref()
            .unwrap()
            .contains("npm ERR! boom"));
        assert!(outcome.results[0]
            .reason
            .as_deref()
            .unwrap()
            .contains("rolled back because react-dom failed"));
        // scheduler never ran
        assert_eq!(runner.scripts().len(), 2);
    }

    #[tokio::test]
    async fn test_dry_run_runs_nothing() {
        let runner = RecordingRunner::new(None);
        let config = config();
        let run = RunConfig::new(".").with_dry_run(true);
        let executor = UpdateExecutor::new(&runner, &config, &run);

        let outcome = executor.execute(&unit(&["react"]), &CancelSignal::never()).await;
        assert_eq!(outcome.results[0].outcome, Outcome::Planned);
        assert_eq!(outcome.results[0].target.as_deref(), Some("17.0.2"));
        assert!(runner.scripts().is_empty());
    }
}
