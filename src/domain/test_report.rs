//! System test report types

use serde::{Deserialize, Serialize};
use std::fmt;

/// When a set of system tests ran
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestPhase {
    /// Before any update
    Preflight,
    /// After a single execution unit
    AfterEach,
    /// Once after all execution units
    AfterAll,
}

impl fmt::Display for TestPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TestPhase::Preflight => "Preflight",
            TestPhase::AfterEach => "After Update",
            TestPhase::AfterAll => "Validation",
        };
        f.write_str(s)
    }
}

/// Terminal state of one test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestStatus {
    /// Exited with status zero in time
    Passed,
    /// Non-zero exit, timeout, or failure to start
    Failed,
    /// Not run because an earlier test stopped the sequence
    Skipped,
}

/// Result of one system test
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestResult {
    /// Test name
    pub name: String,
    /// Terminal state
    pub status: TestStatus,
    /// Failure does not stop the sequence
    pub continue_on_fail: bool,
    /// Wall-clock duration in milliseconds
    pub duration_ms: u64,
    /// Error detail for failed tests
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TestResult {
    /// Returns true if the test failed
    pub fn failed(&self) -> bool {
        self.status == TestStatus::Failed
    }

    /// Returns true if the failure stops the sequence
    pub fn is_critical(&self) -> bool {
        self.failed() && !self.continue_on_fail
    }
}

/// Results of one invocation of the system test runner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemTestReport {
    /// Invocation point
    pub phase: TestPhase,
    /// Unit label for after-each runs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    /// Per-test results in configured order
    pub results: Vec<TestResult>,
    /// Total wall-clock duration in milliseconds
    pub total_duration_ms: u64,
}

impl SystemTestReport {
    /// Creates an empty report
    pub fn new(phase: TestPhase) -> Self {
        Self {
            phase,
            unit: None,
            results: Vec::new(),
            total_duration_ms: 0,
        }
    }

    /// Number of passed tests
    pub fn passed_count(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.status == TestStatus::Passed)
            .count()
    }

    /// Number of failed tests
    pub fn failed_count(&self) -> usize {
        self.results.iter().filter(|r| r.failed()).count()
    }

    /// Returns true if no test failed
    pub fn passed(&self) -> bool {
        self.failed_count() == 0
    }

    /// Failed tests without continue-on-fail
    pub fn critical_failures(&self) -> impl Iterator<Item = &TestResult> {
        self.results.iter().filter(|r| r.is_critical())
    }

    /// Returns true if the validation outcome is Failed
    pub fn has_critical_failure(&self) -> bool {
        self.critical_failures().next().is_some()
    }

    /// One-line summary
    pub fn summary(&self) -> String {
        let total = self.results.len();
        if self.passed() {
            format!("All {} system tests passed", total)
        } else {
            format!(
                "{}/{} system tests passed ({} failed)",
                self.passed_count(),
                total,
                self.failed_count()
            )
        }
    }
}
