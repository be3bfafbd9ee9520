//! Run summary types
//!
//! Provides the terminal artifact of a run: per-package results, counts,
//! system test reports and the overall verdict.

use super::{Outcome, PackageResult, SystemTestReport};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Run-level classification driving the process exit code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// Nothing failed
    Success,
    /// Some packages updated, some failed, continue-on-fail set
    PartialFailure,
    /// Failures without a partial success
    CompleteFailure,
    /// Configuration or validation prevented processing
    ConfigError,
}

impl Verdict {
    /// Process exit code for this verdict
    pub fn exit_code(&self) -> u8 {
        match self {
            Verdict::Success => 0,
            Verdict::PartialFailure => 1,
            Verdict::CompleteFailure => 2,
            Verdict::ConfigError => 3,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Verdict::Success => "success",
            Verdict::PartialFailure => "partial failure",
            Verdict::CompleteFailure => "complete failure",
            Verdict::ConfigError => "configuration error",
        };
        f.write_str(s)
    }
}

/// Summary of a whole run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// Whether this was a dry run
    pub dry_run: bool,
    /// Overall verdict
    pub verdict: Verdict,
    /// Every package result, including skipped and unsupported ones
    pub packages: Vec<PackageResult>,
    /// System test reports in execution order
    pub system_tests: Vec<SystemTestReport>,
    /// Non-fatal problems
    pub warnings: Vec<String>,
    /// Run-level errors
    pub errors: Vec<String>,
}

impl RunSummary {
    fn count(&self, outcome: Outcome) -> usize {
        self.packages.iter().filter(|r| r.outcome == outcome).count()
    }

    /// Total number of packages
    pub fn total(&self) -> usize {
        self.packages.len()
    }

    /// Number of applied updates
    pub fn updated(&self) -> usize {
        self.count(Outcome::Updated)
    }

    /// Number of dry-run planned updates
    pub fn planned(&self) -> usize {
        self.count(Outcome::Planned)
    }

    /// Number of up-to-date packages
    pub fn up_to_date(&self) -> usize {
        self.count(Outcome::UpToDate)
    }

    /// Number of failed packages
    pub fn failed(&self) -> usize {
        self.count(Outcome::Failed)
    }

    /// Number of skipped packages
    pub fn skipped(&self) -> usize {
        self.count(Outcome::Skipped)
    }

    /// Number of unsupported packages
    pub fn unsupported(&self) -> usize {
        self.count(Outcome::Unsupported)
    }

    /// Updated, planned and up-to-date packages
    pub fn succeeded(&self) -> usize {
        self.updated() + self.planned() + self.up_to_date()
    }

    /// Returns results with the given outcome
    pub fn with_outcome(&self, outcome: Outcome) -> impl Iterator<Item = &PackageResult> {
        self.packages.iter().filter(move |r| r.outcome == outcome)
    }

    /// Process exit code
    pub fn exit_code(&self) -> u8 {
        self.verdict.exit_code()
    }
}
