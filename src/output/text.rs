//! Text output formatter for human-readable display
//!
//! This module provides:
//! - Package results grouped by outcome, with colors
//! - Semantic version change type indication (major/minor/patch)
//! - System test reports
//! - Summary counts and the final verdict

use crate::domain::{Outcome, PackageResult, RunSummary, Verdict};
use crate::output::{OutputFormatter, Verbosity};
use crate::systemtest::render_report;
use crate::update::parse_version;
use colored::Colorize;
use std::io::Write;

/// Semantic version change type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionChangeType {
    /// Major version change (breaking)
    Major,
    /// Minor version change (features)
    Minor,
    /// Patch version change (fixes)
    Patch,
    /// Unknown or unparseable
    Unknown,
}

impl VersionChangeType {
    /// Determine the change type between two versions
    pub fn from_versions(old: &str, new: &str) -> Self {
        match (parse_version(old), parse_version(new)) {
            (Some(old), Some(new)) if new.major != old.major => VersionChangeType::Major,
            (Some(old), Some(new)) if new.minor != old.minor => VersionChangeType::Minor,
            (Some(_), Some(_)) => VersionChangeType::Patch,
            _ => VersionChangeType::Unknown,
        }
    }

    /// Get the display label with color
    pub fn colored_label(&self) -> String {
        match self {
            VersionChangeType::Major => "major".red().bold().to_string(),
            VersionChangeType::Minor => "minor".yellow().to_string(),
            VersionChangeType::Patch => "patch".green().to_string(),
            VersionChangeType::Unknown => "?".dimmed().to_string(),
        }
    }
}

/// Text formatter for human-readable output
pub struct TextFormatter {
    verbosity: Verbosity,
}

impl TextFormatter {
    /// Create a new text formatter
    pub fn new(verbosity: Verbosity) -> Self {
        Self { verbosity }
    }

    /// Calculate the maximum package name length for alignment
    fn max_name_length(results: &[&PackageResult]) -> usize {
        results
            .iter()
            .map(|r| r.package.name.len())
            .max()
            .unwrap_or(0)
            .max(16)
    }

    fn section_title(outcome: Outcome, dry_run: bool) -> String {
        match outcome {
            Outcome::Updated => "Updated".green().bold().to_string(),
            Outcome::Planned if dry_run => "Planned (dry-run)".cyan().bold().to_string(),
            Outcome::Planned => "Planned".cyan().bold().to_string(),
            Outcome::UpToDate => "Up to date".dimmed().to_string(),
            Outcome::Failed => "Failed".red().bold().to_string(),
            Outcome::Skipped => "Skipped".yellow().to_string(),
            Outcome::Unsupported => "Unsupported".yellow().to_string(),
        }
    }

    /// Format a single result line
    fn format_line(
        result: &PackageResult,
        width: usize,
        writer: &mut dyn Write,
    ) -> std::io::Result<()> {
        let name = format!("{:width$}", result.package.name, width = width);
        let current = result.package.current_version();
        let group = result
            .group
            .as_deref()
            .map(|g| format!(" ({})", g).dimmed().to_string())
            .unwrap_or_default();

        match (result.outcome, result.target.as_deref()) {
            (Outcome::Updated | Outcome::Planned, Some(target)) => writeln!(
                writer,
                "  {} {} {} {} [{}]{}",
                name,
                current.dimmed(),
                "→".dimmed(),
                target.bright_white().bold(),
                VersionChangeType::from_versions(current, target).colored_label(),
                group
            ),
            (Outcome::Failed, target) => {
                let kind = result.failure.map(|k| k.to_string()).unwrap_or_default();
                match target {
                    Some(target) => writeln!(
                        writer,
                        "  {} {} {} {} [{}]{}",
                        name.red(),
                        current.dimmed(),
                        "→".dimmed(),
                        target,
                        kind.red(),
                        group
                    )?,
                    None => writeln!(writer, "  {} [{}]{}", name.red(), kind.red(), group)?,
                }
                if let Some(reason) = &result.reason {
                    for line in reason.lines() {
                        writeln!(writer, "      {}", line.dimmed())?;
                    }
                }
                Ok(())
            }
            _ => match &result.reason {
                Some(reason) => writeln!(
                    writer,
                    "  {} {} {}{}",
                    name,
                    current.dimmed(),
                    format!("({})", reason).dimmed(),
                    group
                ),
                None => writeln!(writer, "  {} {}{}", name, current.dimmed(), group),
            },
        }
    }

    fn format_section(
        &self,
        summary: &RunSummary,
        outcome: Outcome,
        writer: &mut dyn Write,
    ) -> std::io::Result<()> {
        let results: Vec<&PackageResult> = summary.with_outcome(outcome).collect();
        if results.is_empty() {
            return Ok(());
        }
        let width = Self::max_name_length(&results);
        writeln!(
            writer,
            "{} ({})",
            Self::section_title(outcome, summary.dry_run),
            results.len()
        )?;
        for result in results {
            Self::format_line(result, width, writer)?;
        }
        writeln!(writer)
    }

    fn format_counts(summary: &RunSummary) -> String {
        let mut parts = Vec::new();
        let counts = [
            (summary.updated(), "updated"),
            (summary.planned(), "planned"),
            (summary.up_to_date(), "up to date"),
            (summary.failed(), "failed"),
            (summary.skipped(), "skipped"),
            (summary.unsupported(), "unsupported"),
        ];
        for (count, label) in counts {
            if count > 0 {
                parts.push(format!("{} {}", count, label));
            }
        }
        let packages = if summary.total() == 1 {
            "package"
        } else {
            "packages"
        };
        if parts.is_empty() {
            format!("{} {}", summary.total(), packages)
        } else {
            format!("{} {}: {}", summary.total(), packages, parts.join(", "))
        }
    }

    fn format_verdict(summary: &RunSummary) -> String {
        let label = format!(
            "{} (exit code {})",
            summary.verdict,
            summary.exit_code()
        );
        match summary.verdict {
            Verdict::Success => label.green().bold().to_string(),
            Verdict::PartialFailure => label.yellow().bold().to_string(),
            Verdict::CompleteFailure | Verdict::ConfigError => label.red().bold().to_string(),
        }
    }
}

impl OutputFormatter for TextFormatter {
    fn format(&self, summary: &RunSummary, writer: &mut dyn Write) -> std::io::Result<()> {
        let quiet = self.verbosity == Verbosity::Quiet;

        if summary.total() == 0 && !quiet {
            writeln!(writer, "{}", "No packages matched.".dimmed())?;
            writeln!(writer)?;
        }

        if quiet {
            self.format_section(summary, Outcome::Failed, writer)?;
        } else {
            let mut sections = vec![
                Outcome::Updated,
                Outcome::Planned,
                Outcome::Failed,
                Outcome::Unsupported,
                Outcome::Skipped,
            ];
            if self.verbosity == Verbosity::Verbose {
                sections.push(Outcome::UpToDate);
            }
            for outcome in sections {
                self.format_section(summary, outcome, writer)?;
            }

            for report in &summary.system_tests {
                write!(writer, "{}", render_report(report))?;
                writeln!(writer)?;
            }

            if !summary.warnings.is_empty() {
                writeln!(writer, "{}", "Warnings:".yellow().bold())?;
                for warning in &summary.warnings {
                    writeln!(writer, "  {} {}", "!".yellow(), warning)?;
                }
                writeln!(writer)?;
            }
        }

        if !summary.errors.is_empty() {
            writeln!(writer, "{}", "Errors:".red().bold())?;
            for error in &summary.errors {
                writeln!(writer, "  {} {}", "✗".red(), error)?;
            }
            writeln!(writer)?;
        }

        if !quiet {
            writeln!(writer, "{}", Self::format_counts(summary))?;
        }
        writeln!(writer, "Result: {}", Self::format_verdict(summary))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::ResultAggregator;
    use crate::domain::Package;
    use crate::output::fixtures::sample_summary;

    fn render(summary: &RunSummary, verbosity: Verbosity) -> String {
        colored::control::set_override(false);
        let mut out = Vec::new();
        TextFormatter::new(verbosity).format(summary, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_version_change_type() {
        assert_eq!(
            VersionChangeType::from_versions("17.0.2", "18.0.0"),
            VersionChangeType::Major
        );
        assert_eq!(
            VersionChangeType::from_versions("1.2.3", "1.3.0"),
            VersionChangeType::Minor
        );
        assert_eq!(
            VersionChangeType::from_versions("v1.2.3", "1.2.4"),
            VersionChangeType::Patch
        );
        assert_eq!(
            VersionChangeType::from_versions("latest", "1.0.0"),
            VersionChangeType::Unknown
        );
    }

    #[test]
    fn test_normal_output() {
        let text = render(&sample_summary(), Verbosity::Normal);
        assert!(text.contains("Updated (1)"));
        assert!(text.contains("react"));
        assert!(text.contains("17.0.0 → 17.0.2 [patch]"));
        assert!(text.contains("Failed (1)"));
        assert!(text.contains("[execution] (http)"));
        assert!(text.contains("Unsupported (1)"));
        assert!(text.contains("(floating constraint cannot be updated)"));
        assert!(text.contains("System Tests (Validation)"));
        assert!(text.contains("! lock file missing for rule npm"));
        assert!(text.contains("3 packages: 1 updated, 1 failed, 1 unsupported"));
        assert!(text.ends_with("Result: partial failure (exit code 1)\n"));
    }

    #[test]
    fn test_quiet_output_only_failures() {
        let text = render(&sample_summary(), Verbosity::Quiet);
        assert!(text.contains("Failed (1)"));
        assert!(!text.contains("Updated (1)"));
        assert!(!text.contains("System Tests"));
        assert!(text.contains("Result: partial failure"));
    }

    #[test]
    fn test_up_to_date_only_in_verbose() {
        let mut aggregator = ResultAggregator::new(false, false);
        aggregator.record(PackageResult::up_to_date(Package::new("npm", "lodash", "^", "4.17.21")));
        let summary = aggregator.finish();

        assert!(!render(&summary, Verbosity::Normal).contains("Up to date (1)"));
        let verbose = render(&summary, Verbosity::Verbose);
        assert!(verbose.contains("Up to date (1)"));
        assert!(verbose.contains("1 package: 1 up to date"));
    }

    #[test]
    fn test_empty_run() {
        let text = render(&ResultAggregator::new(false, false).finish(), Verbosity::Normal);
        assert!(text.contains("No packages matched."));
        assert!(text.contains("0 packages"));
        assert!(text.contains("Result: success (exit code 0)"));
    }

    #[test]
    fn test_dry_run_section() {
        let mut aggregator = ResultAggregator::new(true, false);
        aggregator.record(PackageResult::planned(
            Package::new("npm", "react", "^", "17.0.0"),
            "18.0.0",
        ));
        let text = render(&aggregator.finish(), Verbosity::Normal);
        assert!(text.contains("Planned (dry-run) (1)"));
        assert!(text.contains("17.0.0 → 18.0.0 [major]"));
    }
}
