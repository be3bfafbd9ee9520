//! System test execution
//!
//! Runs the configured validation command sets in order. A failing test
//! with `continue_on_fail` is recorded and the next test runs; any other
//! failure marks the remaining tests as skipped.

use crate::command::{CancelSignal, CommandRequest, CommandRunner};
use crate::config::SystemTestsConfig;
use crate::domain::{SystemTestReport, TestPhase, TestResult, TestStatus};
use colored::Colorize;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Runs system tests through a command runner
pub struct SystemTestRunner<'a> {
    runner: &'a dyn CommandRunner,
    working_dir: &'a Path,
    no_timeout: bool,
}

impl<'a> SystemTestRunner<'a> {
    /// Creates a test runner for a project directory
    pub fn new(runner: &'a dyn CommandRunner, working_dir: &'a Path, no_timeout: bool) -> Self {
        Self {
            runner,
            working_dir,
            no_timeout,
        }
    }

    /// Runs every configured test for one invocation point
    pub async fn run(
        &self,
        phase: TestPhase,
        unit: Option<&str>,
        config: &SystemTestsConfig,
        cancel: &CancelSignal,
    ) -> SystemTestReport {
        let mut report = SystemTestReport::new(phase);
        report.unit = unit.map(String::from);
        let started = Instant::now();
        let mut stopped = false;

        info!(phase = %phase, tests = config.tests.len(), "running system tests");

        for test in &config.tests {
            if stopped {
                report.results.push(TestResult {
                    name: test.name.clone(),
                    status: TestStatus::Skipped,
                    continue_on_fail: test.continue_on_fail,
                    duration_ms: 0,
                    error: None,
                });
                continue;
            }

            let timeout = if self.no_timeout {
                None
            } else {
                Some(std::time::Duration::from_secs(test.timeout_secs()))
            };
            let request = CommandRequest::new(&test.commands, self.working_dir)
                .with_env(test.env.clone())
                .with_timeout(timeout);

            let test_started = Instant::now();
            let outcome = self.runner.run(&request, cancel).await;
            let duration_ms = test_started.elapsed().as_millis() as u64;

            let result = match outcome {
                Ok(_) => {
                    debug!(test = %test.name, duration_ms, "system test passed");
                    TestResult {
                        name: test.name.clone(),
                        status: TestStatus::Passed,
                        continue_on_fail: test.continue_on_fail,
                        duration_ms,
                        error: None,
                    }
                }
                Err(e) => {
                    warn!(test = %test.name, error = %e, "system test failed");
                    // Cancellation always stops the sequence
                    if !test.continue_on_fail || e.is_cancelled() {
                        stopped = true;
                    }
                    TestResult {
                        name: test.name.clone(),
                        status: TestStatus::Failed,
                        continue_on_fail: test.continue_on_fail && !e.is_cancelled(),
                        duration_ms,
                        error: Some(e.to_string()),
                    }
                }
            };
            report.results.push(result);
        }

        report.total_duration_ms = started.elapsed().as_millis() as u64;
        info!(phase = %phase, summary = %report.summary(), "system tests finished");
        report
    }
}

/// Renders a report with pass/fail icons and durations
pub fn render_report(report: &SystemTestReport) -> String {
    let mut out = String::new();
    let title = match &report.unit {
        Some(unit) => format!("System Tests ({}: {})", report.phase, unit),
        None => format!("System Tests ({})", report.phase),
    };
    out.push_str(&format!("{}\n", title.bold()));

    for result in &report.results {
        let line = match result.status {
            TestStatus::Passed => format!(
                "  {} {} ({})",
                "✓".green(),
                result.name,
                format_duration(result.duration_ms)
            ),
            TestStatus::Failed => {
                let mut line = format!(
                    "  {} {} ({})",
                    "✗".red(),
                    result.name.red(),
                    format_duration(result.duration_ms)
                );
                if result.continue_on_fail {
                    line.push_str(&format!(" {}", "[continue on fail]".dimmed()));
                }
                if let Some(error) = &result.error {
                    line.push_str(&format!("\n      {}", error.dimmed()));
                }
                line
            }
            TestStatus::Skipped => format!("  {} {} (skipped)", "-".dimmed(), result.name.dimmed()),
        };
        out.push_str(&line);
        out.push('\n');
    }

    let summary = report.summary();
    let summary = if report.passed() {
        summary.green().to_string()
    } else {
        summary.red().to_string()
    };
    out.push_str(&format!(
        "  {} in {}\n",
        summary,
        format_duration(report.total_duration_ms)
    ));
    out
}

fn format_duration(ms: u64) -> String {
    if ms < 1000 {
        format!("{}ms", ms)
    } else {
        format!("{:.1}s", ms as f64 / 1000.0)
    }
}
