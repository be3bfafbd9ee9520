//! JSON output formatter for machine processing

use crate::domain::{RunSummary, SystemTestReport};
use crate::output::{OutputFormatter, PackageRow};
use serde::Serialize;
use std::io::Write;

/// JSON formatter for machine-readable output
pub struct JsonFormatter;

/// JSON representation of the full result
#[derive(Serialize)]
struct JsonOutput<'a> {
    summary: JsonSummary,
    packages: Vec<JsonPackage<'a>>,
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    system_tests: &'a [SystemTestReport],
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    warnings: &'a [String],
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    errors: &'a [String],
}

/// JSON representation of summary statistics
#[derive(Serialize)]
struct JsonSummary {
    total_packages: usize,
    succeeded_packages: usize,
    updated_packages: usize,
    planned_packages: usize,
    up_to_date_packages: usize,
    failed_packages: usize,
    skipped_packages: usize,
    unsupported_packages: usize,
    dry_run: bool,
    verdict: String,
    exit_code: u8,
    started_at: String,
}

/// JSON representation of one package result
#[derive(Serialize)]
struct JsonPackage<'a> {
    rule: &'a str,
    pm: &'a str,
    #[serde(rename = "type")]
    package_type: &'static str,
    constraint: &'a str,
    version: &'a str,
    installed_version: &'a str,
    target: &'a str,
    status: String,
    #[serde(skip_serializing_if = "str::is_empty")]
    group: &'a str,
    name: &'a str,
    #[serde(skip_serializing_if = "String::is_empty")]
    failure: String,
    #[serde(skip_serializing_if = "str::is_empty")]
    error: &'a str,
}

impl<'a> From<PackageRow<'a>> for JsonPackage<'a> {
    fn from(row: PackageRow<'a>) -> Self {
        Self {
            rule: row.rule,
            pm: row.package_manager,
            package_type: row.package_type,
            constraint: row.constraint,
            version: row.version,
            installed_version: row.installed_version,
            target: row.target,
            status: row.status,
            group: row.group,
            name: row.name,
            failure: row.failure,
            error: row.error,
        }
    }
}

impl OutputFormatter for JsonFormatter {
    fn format(&self, summary: &RunSummary, writer: &mut dyn Write) -> std::io::Result<()> {
        let output = JsonOutput {
            summary: JsonSummary {
                total_packages: summary.total(),
                succeeded_packages: summary.succeeded(),
                updated_packages: summary.updated(),
                planned_packages: summary.planned(),
                up_to_date_packages: summary.up_to_date(),
                failed_packages: summary.failed(),
                skipped_packages: summary.skipped(),
                unsupported_packages: summary.unsupported(),
                dry_run: summary.dry_run,
                verdict: summary.verdict.to_string(),
                exit_code: summary.exit_code(),
                started_at: summary.started_at.to_rfc3339(),
            },
            packages: summary
                .packages
                .iter()
                .map(|r| PackageRow::from(r).into())
                .collect(),
            system_tests: &summary.system_tests,
            warnings: &summary.warnings,
            errors: &summary.errors,
        };

        serde_json::to_writer_pretty(&mut *writer, &output)?;
        writeln!(writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::ResultAggregator;
    use crate::output::fixtures::sample_summary;

    fn render(summary: &RunSummary) -> serde_json::Value {
        let mut out = Vec::new();
        JsonFormatter.format(summary, &mut out).unwrap();
        serde_json::from_slice(&out).unwrap()
    }

    #[test]
    fn test_empty_run() {
        let json = render(&ResultAggregator::new(false, false).finish());
        assert_eq!(json["summary"]["total_packages"], 0);
        assert_eq!(json["summary"]["verdict"], "success");
        assert_eq!(json["summary"]["exit_code"], 0);
        assert_eq!(json["packages"], serde_json::json!([]));
        assert!(json.get("errors").is_none());
    }

    #[test]
    fn test_counts_and_packages() {
        let json = render(&sample_summary());
        let summary = &json["summary"];
        assert_eq!(summary["total_packages"], 3);
        assert_eq!(summary["updated_packages"], 1);
        assert_eq!(summary["succeeded_packages"], 1);
        assert_eq!(summary["failed_packages"], 1);
        assert_eq!(summary["unsupported_packages"], 1);
        assert_eq!(summary["verdict"], "partial failure");
        assert_eq!(summary["exit_code"], 1);

        let packages = json["packages"].as_array().unwrap();
        assert_eq!(packages.len(), 3);
        assert_eq!(packages[0]["name"], "react");
        assert_eq!(packages[0]["status"], "Updated");
        assert_eq!(packages[0]["target"], "17.0.2");
        assert_eq!(packages[0]["type"], "prod");
        assert!(packages[0].get("error").is_none());
        assert_eq!(packages[1]["failure"], "execution");
        assert_eq!(packages[1]["group"], "http");
        assert_eq!(packages[2]["status"], "Unsupported");
    }

    #[test]
    fn test_system_tests_and_warnings() {
        let json = render(&sample_summary());
        assert_eq!(json["system_tests"][0]["phase"], "after_all");
        assert_eq!(json["system_tests"][0]["results"][0]["name"], "unit");
        assert_eq!(json["warnings"][0], "lock file missing for rule npm");
    }
}
