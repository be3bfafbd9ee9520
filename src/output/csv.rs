//! CSV output formatter
//!
//! Writes a header and one RFC 4180 row per package.

use crate::domain::RunSummary;
use crate::output::{OutputFormatter, PackageRow};
use std::io::Write;

const HEADER: [&str; 12] = [
    "RULE",
    "PM",
    "TYPE",
    "CONSTRAINT",
    "VERSION",
    "INSTALLED",
    "TARGET",
    "STATUS",
    "FAILURE",
    "GROUP",
    "NAME",
    "ERROR",
];

/// CSV formatter, one row per package
pub struct CsvFormatter;

impl OutputFormatter for CsvFormatter {
    fn format(&self, summary: &RunSummary, writer: &mut dyn Write) -> std::io::Result<()> {
        write_record(writer, HEADER)?;
        for result in &summary.packages {
            let row = PackageRow::from(result);
            write_record(
                writer,
                [
                    row.rule,
                    row.package_manager,
                    row.package_type,
                    row.constraint,
                    row.version,
                    row.installed_version,
                    row.target,
                    &row.status,
                    &row.failure,
                    row.group,
                    row.name,
                    row.error,
                ],
            )?;
        }
        Ok(())
    }
}

fn write_record<'a>(
    writer: &mut dyn Write,
    fields: impl IntoIterator<Item = &'a str>,
) -> std::io::Result<()> {
    let line = fields
        .into_iter()
        .map(escape_field)
        .collect::<Vec<_>>()
        .join(",");
    write!(writer, "{}\r\n", line)
}

/// Quotes a field containing a separator, quote or line break
fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\r', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::ResultAggregator;
    use crate::output::fixtures::sample_summary;

    fn render(summary: &RunSummary) -> String {
        let mut out = Vec::new();
        CsvFormatter.format(summary, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_escape_field() {
        assert_eq!(escape_field("react"), "react");
        assert_eq!(escape_field("a,b"), "\"a,b\"");
        assert_eq!(escape_field("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(escape_field("line\nbreak"), "\"line\nbreak\"");
        assert_eq!(escape_field(""), "");
    }

    #[test]
    fn test_header_only_for_empty_run() {
        let csv = render(&ResultAggregator::new(false, false).finish());
        assert_eq!(
            csv,
            "RULE,PM,TYPE,CONSTRAINT,VERSION,INSTALLED,TARGET,STATUS,FAILURE,GROUP,NAME,ERROR\r\n"
        );
    }

    #[test]
    fn test_one_row_per_package() {
        let csv = render(&sample_summary());
        let lines: Vec<&str> = csv.split("\r\n").filter(|l| !l.is_empty()).collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[1], "npm,npm,prod,^,17.0.0,17.0.0,17.0.2,Updated,,,react,");
        assert!(lines[2].starts_with("npm,npm,prod,~,1.5.0,,,Failed,execution,http,axios,\""));
        assert!(lines[2].contains("\"\"quoted\"\""));
        assert!(lines[3].contains("Unsupported"));
    }
}
