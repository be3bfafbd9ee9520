//! Output formatting for run summaries
//!
//! This module provides:
//! - Text output for human-readable display
//! - JSON, CSV and XML output for machine processing
//!
//! Structured formats always carry every package result, including skipped
//! and unsupported ones.

mod csv;
mod json;
mod text;
mod xml;

pub use self::csv::CsvFormatter;
pub use json::JsonFormatter;
pub use text::TextFormatter;
pub use xml::XmlFormatter;

use crate::domain::{PackageResult, RunSummary};
use std::fmt;
use std::io::Write;
use std::str::FromStr;

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable text output
    #[default]
    Text,
    /// JSON output for machine processing
    Json,
    /// One CSV row per package
    Csv,
    /// XML document rooted at `updateResult`
    Xml,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "table" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            "xml" => Ok(OutputFormat::Xml),
            other => Err(format!(
                "invalid output format '{}': expected text, json, csv or xml",
                other
            )),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OutputFormat::Text => "text",
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
            OutputFormat::Xml => "xml",
        };
        f.write_str(s)
    }
}

/// Output verbosity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Only failures and the verdict
    Quiet,
    /// Normal output
    #[default]
    Normal,
    /// Also list up-to-date packages
    Verbose,
}

/// Configuration for output formatting
#[derive(Debug, Clone, Default)]
pub struct OutputConfig {
    /// Output format
    pub format: OutputFormat,
    /// Verbosity level (text output only)
    pub verbosity: Verbosity,
}

impl OutputConfig {
    /// Create configuration from CLI arguments
    pub fn from_cli(format: OutputFormat, verbose: bool, quiet: bool) -> Self {
        let verbosity = if quiet {
            Verbosity::Quiet
        } else if verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Normal
        };
        Self { format, verbosity }
    }
}

/// Trait for output formatters
pub trait OutputFormatter {
    /// Format and write the run summary
    fn format(&self, summary: &RunSummary, writer: &mut dyn Write) -> std::io::Result<()>;
}

/// Create an output formatter based on configuration
pub fn create_formatter(config: OutputConfig) -> Box<dyn OutputFormatter> {
    match config.format {
        OutputFormat::Text => Box::new(TextFormatter::new(config.verbosity)),
        OutputFormat::Json => Box::new(JsonFormatter),
        OutputFormat::Csv => Box::new(CsvFormatter),
        OutputFormat::Xml => Box::new(XmlFormatter),
    }
}

/// Flat view of a package result shared by the structured formats
pub(crate) struct PackageRow<'a> {
    pub rule: &'a str,
    pub package_manager: &'a str,
    pub package_type: &'static str,
    pub constraint: &'a str,
    pub version: &'a str,
    pub installed_version: &'a str,
    pub target: &'a str,
    pub status: String,
    pub failure: String,
    pub group: &'a str,
    pub name: &'a str,
    pub error: &'a str,
}

impl<'a> From<&'a PackageResult> for PackageRow<'a> {
    fn from(result: &'a PackageResult) -> Self {
        let package = &result.package;
        Self {
            rule: &package.rule,
            package_manager: &package.package_manager,
            package_type: package.package_type.as_str(),
            constraint: &package.constraint,
            version: &package.version,
            installed_version: package.installed_version.as_deref().unwrap_or_default(),
            target: result.target.as_deref().unwrap_or_default(),
            status: result.outcome.to_string(),
            failure: result.failure.map(|k| k.to_string()).unwrap_or_default(),
            group: result.group.as_deref().unwrap_or_default(),
            name: &package.name,
            error: result.reason.as_deref().unwrap_or_default(),
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::aggregate::ResultAggregator;
    use crate::domain::{FailureKind, Package, PackageResult, RunSummary, SystemTestReport, TestPhase, TestResult, TestStatus};

    /// Summary with one result of each interesting kind
    pub fn sample_summary() -> RunSummary {
        let mut aggregator = ResultAggregator::new(false, true);
        aggregator.record(PackageResult::updated(
            Package::new("npm", "react", "^", "17.0.0").with_installed("17.0.0"),
            "17.0.2",
        ));
        aggregator.record(PackageResult::failed(
            Package::new("npm", "axios", "~", "1.5.0").with_group("http"),
            FailureKind::Execution,
            "`npm install axios@1.5.1` failed with exit code 1: ERR, \"quoted\"",
        ));
        aggregator.record(PackageResult::unsupported(
            Package::new("npm", "left-pad", "", "*"),
            "floating constraint cannot be updated",
        ));
        aggregator.record_tests(SystemTestReport {
            phase: TestPhase::AfterAll,
            unit: None,
            results: vec![TestResult {
                name: "unit".to_string(),
                status: TestStatus::Passed,
                continue_on_fail: false,
                duration_ms: 12,
                error: None,
            }],
            total_duration_ms: 12,
        });
        aggregator.warn("lock file missing for rule npm");
        aggregator.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_from_str() {
        assert_eq!("json".parse::<OutputFormat>(), Ok(OutputFormat::Json));
        assert_eq!("CSV".parse::<OutputFormat>(), Ok(OutputFormat::Csv));
        assert_eq!("xml".parse::<OutputFormat>(), Ok(OutputFormat::Xml));
        assert_eq!("table".parse::<OutputFormat>(), Ok(OutputFormat::Text));
        assert!("yaml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_output_config_from_cli() {
        let config = OutputConfig::from_cli(OutputFormat::Json, false, false);
        assert_eq!(config.format, OutputFormat::Json);
        assert_eq!(config.verbosity, Verbosity::Normal);

        assert_eq!(
            OutputConfig::from_cli(OutputFormat::Text, true, false).verbosity,
            Verbosity::Verbose
        );
        // quiet wins over verbose
        assert_eq!(
            OutputConfig::from_cli(OutputFormat::Text, true, true).verbosity,
            Verbosity::Quiet
        );
    }

    #[test]
    fn test_package_row() {
        let summary = fixtures::sample_summary();
        let row = PackageRow::from(&summary.packages[0]);
        assert_eq!(row.name, "react");
        assert_eq!(row.status, "Updated");
        assert_eq!(row.installed_version, "17.0.0");
        assert_eq!(row.target, "17.0.2");
        assert_eq!(row.error, "");

        let row = PackageRow::from(&summary.packages[1]);
        assert_eq!(row.failure, "execution");
        assert_eq!(row.group, "http");
    }

    #[test]
    fn test_every_format_writes() {
        let summary = fixtures::sample_summary();
        for format in [
            OutputFormat::Text,
            OutputFormat::Json,
            OutputFormat::Csv,
            OutputFormat::Xml,
        ] {
            let formatter = create_formatter(OutputConfig {
                format,
                verbosity: Verbosity::Normal,
            });
            let mut out = Vec::new();
            formatter.format(&summary, &mut out).unwrap();
            let text = String::from_utf8(out).unwrap();
            assert!(text.contains("axios"), "{format} output lists every package");
        }
    }
}
