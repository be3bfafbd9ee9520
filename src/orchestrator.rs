//! Update orchestrator for coordinating the entire update workflow
//!
//! This module provides:
//! - Workflow coordination: resolve → plan → validate → confirm → execute → test
//! - Per-unit snapshots with restore on failure
//! - Drift checks that applied and restored versions match the plan
//! - Dry-run mode support
//! - Verdict aggregation with partial continuation

use crate::aggregate::{partial_success_error, ResultAggregator};
use crate::command::{CancelSignal, CommandRunner};
use crate::config::{ProjectConfig, RunConfig, RunMode, SystemTestsConfig};
use crate::confirm::Confirmer;
use crate::domain::{
    ExecutionUnit, FailureKind, PackageResult, RunSummary, SystemTestReport, TestPhase,
};
use crate::error::{AppError, ConfigError, DriftError, RollbackError, ValidationError};
use crate::executor::UpdateExecutor;
use crate::preflight::validate_commands;
use crate::progress::Progress;
use crate::resolver::{PackageResolver, VersionSource};
use crate::rollback::{restore_all, RollbackManager, Snapshot, SnapshotGuard};
use crate::systemtest::SystemTestRunner;
use crate::update::{check_restored, check_updated, Plan, UpdatePlanner};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Result of running the orchestrator
#[derive(Debug)]
pub struct OrchestratorResult {
    /// Run summary with every package result
    pub summary: RunSummary,
    /// Error that ended the run, if any
    pub error: Option<AppError>,
}

impl OrchestratorResult {
    /// Process exit code
    pub fn exit_code(&self) -> u8 {
        self.summary.exit_code()
    }
}

/// Orchestrator for coordinating the update workflow
pub struct Orchestrator {
    run: RunConfig,
    config: ProjectConfig,
    resolver: Arc<dyn PackageResolver>,
    versions: Arc<dyn VersionSource>,
    runner: Arc<dyn CommandRunner>,
    confirmer: Box<dyn Confirmer>,
    show_progress: bool,
}

impl Orchestrator {
    /// Create a new orchestrator for one run
    pub fn new(
        run: RunConfig,
        config: ProjectConfig,
        resolver: Arc<dyn PackageResolver>,
        versions: Arc<dyn VersionSource>,
        runner: Arc<dyn CommandRunner>,
        confirmer: Box<dyn Confirmer>,
    ) -> Self {
        Self {
            run,
            config,
            resolver,
            versions,
            runner,
            confirmer,
            show_progress: false,
        }
    }

    /// Enable or disable the progress display (builder pattern)
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Run the update workflow
    pub async fn run(&self, cancel: &CancelSignal) -> OrchestratorResult {
        let mut progress = Progress::new(self.show_progress);
        let mut aggregator = ResultAggregator::new(self.run.dry_run, self.run.continue_on_fail);

        // Step 1: Resolve packages from manifests and lock data
        progress.spinner("Resolving packages...");
        let packages = match self.resolver.resolve(&self.config, &self.run, cancel).await {
            Ok(packages) => packages,
            Err(e) => {
                progress.finish_and_clear();
                error!(error = %e, "package resolution failed");
                aggregator.abort_config(e.to_string());
                return finish(aggregator, Some(e));
            }
        };
        info!(packages = packages.len(), "resolved packages");

        // Step 2: Plan updates
        progress.spinner("Checking available versions...");
        let planner = UpdatePlanner::new(&self.config, &self.run, &*self.versions);
        let plan = planner.plan(packages, cancel).await;
        progress.finish_and_clear();
        aggregator.record_all(plan.results.iter().cloned());

        // Step 3: Nothing to do
        if plan.is_empty() {
            info!("no updates planned");
            return finish(aggregator, None);
        }

        // Step 4: Check that every command can be started
        if !self.run.dry_run && !self.run.skip_preflight {
            if let Err(e) = validate_commands(
                &plan.units,
                &self.config,
                &self.run.working_dir,
                self.run.skip_lock,
            ) {
                error!(error = %e, "command validation failed");
                aggregator.abort_config(e.to_string());
                skip_units(&mut aggregator, &plan.units, "not attempted: configuration error");
                return finish(aggregator, Some(e.into()));
            }
        }

        let tests = self.config.system_tests();
        let mode = self.run.effective_run_mode(&tests);

        // Step 5: Preflight system tests
        if !self.run.dry_run && mode.runs_preflight(tests.run_preflight) {
            let report = self
                .test_runner()
                .run(TestPhase::Preflight, None, &tests, cancel)
                .await;
            let critical = report.has_critical_failure();
            let summary = report.summary();
            aggregator.record_tests(report);

            if critical && tests.stop_on_fail {
                let e = ConfigError::PreflightFailed { summary };
                error!(error = %e, "aborting before updates");
                aggregator.abort_config(e.to_string());
                skip_units(&mut aggregator, &plan.units, "not attempted: system tests failed before updates");
                return finish(aggregator, Some(e.into()));
            }
            if critical {
                aggregator.warn(format!("system tests failed before updates: {}", summary));
            }
        }

        // Step 6: Confirm
        if !self.run.dry_run && !self.run.assume_yes && !self.confirmer.confirm(&plan) {
            info!("cancelled by user");
            skip_units(&mut aggregator, &plan.units, "cancelled by user");
            return finish(aggregator, None);
        }

        // Step 7: Execute units
        let committed = self
            .execute_units(&plan, mode, &tests, &mut aggregator, &mut progress, cancel)
            .await;

        // Step 8: Validate all updates together
        let mut run_error = None;
        if !self.run.dry_run && mode.runs_after_all() && aggregator.has_updates() {
            let report = self
                .test_runner()
                .run(TestPhase::AfterAll, None, &tests, cancel)
                .await;
            run_error = self.handle_after_all(report, &tests, &committed, &mut aggregator);
        }

        finish(aggregator, run_error)
    }

    async fn execute_units(
        &self,
        plan: &Plan,
        mode: RunMode,
        tests: &SystemTestsConfig,
        aggregator: &mut ResultAggregator,
        progress: &mut Progress,
        cancel: &CancelSignal,
    ) -> Vec<Snapshot> {
        let rollback = RollbackManager::new(&self.run.working_dir, self.run.skip_lock);
        let executor = UpdateExecutor::new(&*self.runner, &self.config, &self.run);
        let test_runner = self.test_runner();
        let mut committed = Vec::new();
        let mut halted: Option<String> = None;

        progress.start(plan.units.len() as u64, "Updating");

        for unit in &plan.units {
            if halted.is_none() && cancel.is_cancelled() {
                halted = Some("cancelled".to_string());
            }
            if let Some(reason) = &halted {
                skip_units(aggregator, std::slice::from_ref(unit), reason);
                progress.inc();
                continue;
            }
            progress.set_message(&unit.label());

            if self.run.dry_run {
                let outcome = executor.execute(unit, cancel).await;
                aggregator.record_all(outcome.results);
                progress.inc();
                continue;
            }

            let guard = match rollback.capture(unit, &self.config) {
                Ok(guard) => guard,
                Err(e) => {
                    error!(unit = %unit.label(), error = %e, "snapshot failed");
                    aggregator.record_all(unit.actions.iter().map(|a| {
                        PackageResult::failed(a.package.clone(), FailureKind::Rollback, e.to_string())
                            .with_target(&a.target)
                    }));
                    aggregator.error(format!("{} not updated: {}", unit.label(), e));
                    if !self.run.continue_on_fail {
                        halted = Some(format!("not attempted after {} failed", unit.label()));
                    }
                    progress.inc();
                    continue;
                }
            };

            let outcome = executor.execute(unit, cancel).await;
            if outcome.failed {
                let mut results = outcome.results;
                if let Err(e) = self.restore_unit(guard, unit).await {
                    results = mark_rollback_failed(results, &e);
                    aggregator.rollback_failed(format!("failed to restore {}: {}", unit.label(), e));
                    halted = Some(format!("not attempted after restoring {} failed", unit.label()));
                }
                aggregator.record_all(results);
                if outcome.cancelled {
                    halted = Some("cancelled".to_string());
                } else if !self.run.continue_on_fail && halted.is_none() {
                    halted = Some(format!("not attempted after {} failed", unit.label()));
                }
                progress.inc();
                continue;
            }

            if let Err((culprit, failure)) = self.check_applied(unit, cancel).await {
                warn!(unit = %unit.label(), error = %failure, "drift detected, restoring unit");
                let mut results: Vec<PackageResult> = outcome
                    .results
                    .into_iter()
                    .map(|r| {
                        let message = match culprit.as_deref() {
                            Some(name) if name != r.package_name() => {
                                format!("{} rolled back because {} failed", unit.label(), name)
                            }
                            _ => failure.to_string(),
                        };
                        r.into_failed(FailureKind::Execution, message)
                    })
                    .collect();
                if let Err(e) = self.restore_unit(guard, unit).await {
                    results = mark_rollback_failed(results, &e);
                    aggregator.rollback_failed(format!("failed to restore {}: {}", unit.label(), e));
                    halted = Some(format!("not attempted after restoring {} failed", unit.label()));
                }
                aggregator.record_all(results);
                if !self.run.continue_on_fail && halted.is_none() {
                    halted = Some(format!("not attempted after {} failed", unit.label()));
                }
                progress.inc();
                continue;
            }

            if mode.runs_after_each() {
                let label = unit.label();
                let report = test_runner
                    .run(TestPhase::AfterEach, Some(&label), tests, cancel)
                    .await;
                let critical = report.has_critical_failure();
                let summary = report.summary();
                aggregator.record_tests(report);

                if critical {
                    let failure = ValidationError::AfterUnit {
                        unit: label.clone(),
                        summary,
                    };
                    warn!(unit = %label, error = %failure, "restoring unit");
                    let mut results: Vec<PackageResult> = outcome
                        .results
                        .into_iter()
                        .map(|r| r.into_failed(FailureKind::Validation, failure.to_string()))
                        .collect();
                    if let Err(e) = self.restore_unit(guard, unit).await {
                        results = mark_rollback_failed(results, &e);
                        aggregator.rollback_failed(format!("failed to restore {}: {}", label, e));
                        halted = Some(format!("not attempted after restoring {} failed", label));
                    }
                    aggregator.record_all(results);
                    if tests.stop_on_fail && halted.is_none() {
                        halted = Some(format!("not attempted after system tests failed for {}", label));
                    }
                    progress.inc();
                    continue;
                }
            }

            committed.extend(guard.commit());
            aggregator.record_all(outcome.results);
            progress.inc();
        }

        progress.finish_and_clear();
        committed
    }

    /// Resolves the packages again and checks every action of an applied unit
    ///
    /// The error names the first mismatching package, or `None` when the
    /// packages could not be reloaded at all.
    async fn check_applied(
        &self,
        unit: &ExecutionUnit,
        cancel: &CancelSignal,
    ) -> Result<(), (Option<String>, DriftError)> {
        let reloaded = self
            .resolver
            .resolve(&self.config, &self.run, cancel)
            .await
            .map_err(|e| {
                let failure = DriftError::Reload {
                    message: e.to_string(),
                };
                (None, failure)
            })?;
        for action in &unit.actions {
            check_updated(action, &reloaded)
                .map_err(|e| (Some(action.package.name.clone()), e))?;
        }
        debug!(unit = %unit.label(), "drift check passed");
        Ok(())
    }

    /// Restores a unit's files and checks the declared versions are back
    async fn restore_unit(
        &self,
        guard: SnapshotGuard,
        unit: &ExecutionUnit,
    ) -> Result<(), RollbackError> {
        guard.restore()?;
        // Verification must finish even when the run is being cancelled
        let reloaded = self
            .resolver
            .resolve(&self.config, &self.run, &CancelSignal::never())
            .await
            .map_err(|e| {
                RollbackError::Unverified(DriftError::Reload {
                    message: e.to_string(),
                })
            })?;
        for action in &unit.actions {
            check_restored(action, &reloaded).map_err(RollbackError::Unverified)?;
        }
        Ok(())
    }

    fn handle_after_all(
        &self,
        report: SystemTestReport,
        tests: &SystemTestsConfig,
        committed: &[Snapshot],
        aggregator: &mut ResultAggregator,
    ) -> Option<AppError> {
        let critical = report.has_critical_failure();
        let summary = report.summary();
        aggregator.record_tests(report);

        if !critical {
            return None;
        }
        if !tests.stop_on_fail {
            aggregator.warn(format!("system tests failed after updates: {}", summary));
            return None;
        }

        warn!(snapshots = committed.len(), "restoring all updates");
        for (label, e) in restore_all(committed) {
            aggregator.rollback_failed(format!("failed to restore {}: {}", label, e));
        }
        aggregator.error(format!("System tests failed after updates: {}", summary));
        let failure = ValidationError::AfterUpdates { summary };
        let names = aggregator.fail_updated(FailureKind::Validation, &failure.to_string());
        aggregator.error(format!("Rolled back: {}", names.join(", ")));
        Some(failure.into())
    }

    fn test_runner(&self) -> SystemTestRunner<'_> {
        SystemTestRunner::new(&*self.runner, &self.run.working_dir, self.run.no_timeout)
    }
}

fn finish(aggregator: ResultAggregator, error: Option<AppError>) -> OrchestratorResult {
    let summary = aggregator.finish();
    let error = error.or_else(|| partial_success_error(&summary).map(AppError::from));
    info!(verdict = %summary.verdict, packages = summary.total(), "run finished");
    OrchestratorResult { summary, error }
}

fn skip_units(aggregator: &mut ResultAggregator, units: &[ExecutionUnit], reason: &str) {
    for unit in units {
        aggregator.record_all(unit.actions.iter().map(|a| {
            PackageResult::skipped(a.package.clone(), reason).with_group(unit.group.clone())
        }));
    }
}

fn mark_rollback_failed(results: Vec<PackageResult>, error: &RollbackError) -> Vec<PackageResult> {
    results
        .into_iter()
        .map(|r| {
            let reason = match &r.reason {
                Some(reason) => format!("{}; {}", reason, error),
                None => error.to_string(),
            };
            r.into_failed(FailureKind::Rollback, reason)
        })
        .collect()
}
