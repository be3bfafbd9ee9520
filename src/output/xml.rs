//! XML output formatter
//!
//! Serializes the run summary with quick-xml under an `updateResult` root.

use crate::domain::RunSummary;
use crate::output::{OutputFormatter, PackageRow};
use serde::Serialize;
use std::io::{Error, ErrorKind, Write};

/// Root element name
const ROOT: &str = "updateResult";

/// XML formatter for machine-readable output
pub struct XmlFormatter;

#[derive(Serialize)]
struct XmlOutput<'a> {
    summary: XmlSummary,
    packages: XmlPackages<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<XmlWarnings<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<XmlErrors<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct XmlSummary {
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
}

#[derive(Serialize)]
struct XmlPackages<'a> {
    package: Vec<XmlPackage<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct XmlPackage<'a> {
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

#[derive(Serialize)]
struct XmlWarnings<'a> {
    warning: &'a [String],
}

#[derive(Serialize)]
struct XmlErrors<'a> {
    error: &'a [String],
}

impl<'a> From<PackageRow<'a>> for XmlPackage<'a> {
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

impl OutputFormatter for XmlFormatter {
    fn format(&self, summary: &RunSummary, writer: &mut dyn Write) -> std::io::Result<()> {
        let output = XmlOutput {
            summary: XmlSummary {
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
            },
            packages: XmlPackages {
                package: summary
                    .packages
                    .iter()
                    .map(|r| PackageRow::from(r).into())
                    .collect(),
            },
            warnings: (!summary.warnings.is_empty()).then_some(XmlWarnings {
                warning: &summary.warnings,
            }),
            errors: (!summary.errors.is_empty()).then_some(XmlErrors {
                error: &summary.errors,
            }),
        };

        let xml = quick_xml::se::to_string_with_root(ROOT, &output)
            .map_err(|e| Error::new(ErrorKind::InvalidData, e.to_string()))?;
        writeln!(writer, "<?xml version=\"1.0\" encoding=\"UTF-8\"?>")?;
        writeln!(writer, "{}", xml)
    }
}
