//! Result aggregation and verdict policy
//!
//! | Condition                                         | Verdict         | Exit |
//! |---------------------------------------------------|-----------------|------|
//! | nothing failed (including no packages)            | Success         | 0    |
//! | updates applied, failures, continue-on-fail       | PartialFailure  | 1    |
//! | any other failure, or a failed restore            | CompleteFailure | 2    |
//! | configuration/validation abort before processing  | ConfigError     | 3    |

use crate::domain::{FailureKind, Outcome, PackageResult, RunSummary, SystemTestReport, Verdict};
use crate::error::PartialSuccessError;
use chrono::{DateTime, Utc};

/// Collects results during a run and produces the summary
#[derive(Debug, Clone)]
pub struct ResultAggregator {
    started_at: DateTime<Utc>,
    dry_run: bool,
    continue_on_fail: bool,
    packages: Vec<PackageResult>,
    system_tests: Vec<SystemTestReport>,
    warnings: Vec<String>,
    errors: Vec<String>,
    config_abort: bool,
    rollback_failed: bool,
}

impl ResultAggregator {
    /// Starts aggregating a run
    pub fn new(dry_run: bool, continue_on_fail: bool) -> Self {
        Self {
            started_at: Utc::now(),
            dry_run,
            continue_on_fail,
            packages: Vec::new(),
            system_tests: Vec::new(),
            warnings: Vec::new(),
            errors: Vec::new(),
            config_abort: false,
            rollback_failed: false,
        }
    }

    /// Adds a package result
    pub fn record(&mut self, result: PackageResult) {
        self.packages.push(result);
    }

    /// Adds several package results
    pub fn record_all(&mut self, results: impl IntoIterator<Item = PackageResult>) {
        self.packages.extend(results);
    }

    /// Adds a system test report
    pub fn record_tests(&mut self, report: SystemTestReport) {
        self.system_tests.push(report);
    }

    /// Adds a non-fatal warning
    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    /// Adds a run-level error
    pub fn error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    /// Marks the run as aborted by configuration or preflight validation
    pub fn abort_config(&mut self, message: impl Into<String>) {
        self.config_abort = true;
        self.error(message);
    }

    /// Marks a failed restore
    pub fn rollback_failed(&mut self, message: impl Into<String>) {
        self.rollback_failed = true;
        self.error(message);
    }

    /// Returns true if any result is Updated
    pub fn has_updates(&self) -> bool {
        self.packages.iter().any(PackageResult::is_updated)
    }

    /// Turns every Updated result into a failure, returning the package names
    pub fn fail_updated(&mut self, kind: FailureKind, message: &str) -> Vec<String> {
        let mut names = Vec::new();
        for result in self.packages.iter_mut() {
            if result.outcome == Outcome::Updated {
                names.push(result.package.name.clone());
                *result = result.clone().into_failed(kind, message);
            }
        }
        names
    }

    /// Derives the verdict and returns the summary
    pub fn finish(self) -> RunSummary {
        let verdict = derive_verdict(
            &self.packages,
            self.continue_on_fail,
            self.config_abort,
            self.rollback_failed,
        );
        RunSummary {
            started_at: self.started_at,
            dry_run: self.dry_run,
            verdict,
            packages: self.packages,
            system_tests: self.system_tests,
            warnings: self.warnings,
            errors: self.errors,
        }
    }
}

/// Verdict for a set of results
///
/// Planned results never count as applied updates, so dry runs cannot end in
/// partial failure.
pub fn derive_verdict(
    packages: &[PackageResult],
    continue_on_fail: bool,
    config_abort: bool,
    rollback_failed: bool,
) -> Verdict {
    if config_abort {
        return Verdict::ConfigError;
    }
    if rollback_failed {
        return Verdict::CompleteFailure;
    }
    let failed = packages.iter().filter(|r| r.is_failed()).count();
    if failed == 0 {
        return Verdict::Success;
    }
    let updated = packages.iter().filter(|r| r.is_updated()).count();
    if updated > 0 && continue_on_fail {
        Verdict::PartialFailure
    } else {
        Verdict::CompleteFailure
    }
}

/// Error surfaced for a partial failure
pub fn partial_success_error(summary: &RunSummary) -> Option<PartialSuccessError> {
    (summary.verdict == Verdict::PartialFailure).then(|| PartialSuccessError {
        succeeded: summary.succeeded(),
        failed: summary.failed(),
    })
}
