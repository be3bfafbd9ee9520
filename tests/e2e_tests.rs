//! End-to-end tests for the depshift CLI
//!
//! These tests verify:
//! - Dry-run mode leaves files unchanged
//! - Structured output schemas (JSON, CSV, XML)
//! - Exit codes for success, partial failure and configuration errors

#![cfg(unix)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

const PACKAGE_JSON: &str = r#"{
  "name": "test-project",
  "version": "1.0.0",
  "dependencies": {
    "lodash": "^4.17.20"
  },
  "devDependencies": {
    "typescript": "~5.0.0"
  }
}
"#;

/// Update command that rewrites the package's declaration to `^target`
const BUMP: &str = r#"sed 's/"{{package}}": "[^"]*"/"{{package}}": "^{{version}}"/' package.json > package.json.tmp && mv package.json.tmp package.json"#;

/// Configuration with `update` as the update command
fn config(update: &str) -> String {
    format!(
        r#"[rules.npm]
manifest = "package.json"

[rules.npm.update]
commands = """{update}"""

[rules.npm.outdated]
commands = """echo '["4.17.21", "5.0.0", "5.0.4", "5.1.0"]'"""
format = "json"
"#
    )
}

/// Create a test directory with a manifest and configuration
fn create_test_project(update: &str) -> TempDir {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
    fs::write(temp_dir.path().join("package.json"), PACKAGE_JSON).unwrap();
    fs::write(temp_dir.path().join("depshift.toml"), config(update)).unwrap();
    temp_dir
}

fn depshift() -> Command {
    let mut cmd = Command::cargo_bin("depshift").expect("binary should be built");
    cmd.env_remove("RUST_LOG");
    cmd
}

mod dry_run_tests {
    use super::*;

    /// Test that dry-run mode does not run updates or modify files
    #[test]
    fn test_dry_run_leaves_files_unchanged() {
        let temp_dir = create_test_project("echo changed > package.json");

        depshift()
            .arg("--dry-run")
            .arg(temp_dir.path())
            .assert()
            .success()
            .stdout(predicate::str::contains("Planned (dry-run) (2)"));

        let after = fs::read_to_string(temp_dir.path().join("package.json")).unwrap();
        assert_eq!(after, PACKAGE_JSON, "package.json should not be modified");
    }

    /// Test that dry-run needs no confirmation
    #[test]
    fn test_dry_run_with_quiet_mode() {
        let temp_dir = create_test_project("echo changed > package.json");

        let output = depshift()
            .args(["--dry-run", "--quiet"])
            .arg(temp_dir.path())
            .output()
            .unwrap();

        assert!(output.status.success());
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(!stdout.contains("Planned"));
        assert!(stdout.contains("Result: success"));
    }
}

mod output_format_tests {
    use super::*;

    /// Test that JSON output has the expected schema
    #[test]
    fn test_json_output_schema() {
        let temp_dir = create_test_project("true");

        let output = depshift()
            .args(["--dry-run", "-o", "json"])
            .arg(temp_dir.path())
            .output()
            .unwrap();
        assert!(output.status.success());

        let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(json["summary"]["total_packages"], 2);
        assert_eq!(json["summary"]["planned_packages"], 2);
        assert_eq!(json["summary"]["dry_run"], true);
        assert_eq!(json["summary"]["exit_code"], 0);

        let packages = json["packages"].as_array().unwrap();
        let lodash = packages.iter().find(|p| p["name"] == "lodash").unwrap();
        assert_eq!(lodash["type"], "prod");
        assert_eq!(lodash["target"], "4.17.21");
        let typescript = packages.iter().find(|p| p["name"] == "typescript").unwrap();
        assert_eq!(typescript["type"], "dev");
        assert_eq!(typescript["target"], "5.0.4");
    }

    /// Test the CSV header and one row per package
    #[test]
    fn test_csv_output() {
        let temp_dir = create_test_project("true");

        let output = depshift()
            .args(["--dry-run", "--output", "csv"])
            .arg(temp_dir.path())
            .output()
            .unwrap();
        assert!(output.status.success());

        let stdout = String::from_utf8(output.stdout).unwrap();
        let lines: Vec<&str> = stdout.lines().collect();
        assert!(lines[0].starts_with("RULE,PM,TYPE,CONSTRAINT,VERSION"));
        assert_eq!(lines.len(), 3);
        assert!(stdout.contains(",lodash,"));
    }

    /// Test the XML root and package elements
    #[test]
    fn test_xml_output() {
        let temp_dir = create_test_project("true");

        depshift()
            .args(["--dry-run", "-o", "xml"])
            .arg(temp_dir.path())
            .assert()
            .success()
            .stdout(predicate::str::starts_with("<?xml"))
            .stdout(predicate::str::contains("<updateResult>"))
            .stdout(predicate::str::contains("<name>typescript</name>"));
    }

    /// Test that an unknown format is rejected by argument parsing
    #[test]
    fn test_unknown_format() {
        let temp_dir = create_test_project("true");

        depshift()
            .args(["-o", "yaml"])
            .arg(temp_dir.path())
            .assert()
            .failure()
            .stderr(predicate::str::contains("yaml"));
    }
}

mod exit_code_tests {
    use super::*;

    /// Test that applied updates exit with 0
    #[test]
    fn test_updates_succeed() {
        let update = ["echo {{package}}@{{version}} >> updates.log", BUMP].join(" && ");
        let temp_dir = create_test_project(&update);

        depshift()
            .arg("--yes")
            .arg(temp_dir.path())
            .assert()
            .code(0)
            .stdout(predicate::str::contains("Updated (2)"));

        let log = fs::read_to_string(temp_dir.path().join("updates.log")).unwrap();
        assert_eq!(log, "lodash@4.17.21\ntypescript@5.0.4\n");
        let manifest = fs::read_to_string(temp_dir.path().join("package.json")).unwrap();
        assert!(manifest.contains(r#""typescript": "^5.0.4""#));
    }

    /// Test that an update command leaving the manifest unchanged fails
    #[test]
    fn test_unchanged_manifest_fails() {
        let temp_dir = create_test_project("true");

        depshift()
            .args(["--yes", "-o", "json"])
            .arg(temp_dir.path())
            .assert()
            .code(2)
            .stdout(predicate::str::contains("version mismatch after update"));
    }

    /// Test that one failure with continue-on-fail exits with 1
    #[test]
    fn test_partial_failure_exit_code() {
        let update = ["test {{package}} != lodash", BUMP].join(" && ");
        let temp_dir = create_test_project(&update);

        depshift()
            .args(["--yes", "--continue-on-fail"])
            .arg(temp_dir.path())
            .assert()
            .code(1);
    }

    /// Test that a failure without continue-on-fail exits with 2
    #[test]
    fn test_complete_failure_exit_code() {
        let temp_dir = create_test_project("false");

        depshift()
            .args(["--yes", "-o", "json"])
            .arg(temp_dir.path())
            .assert()
            .code(2)
            .stdout(predicate::str::contains("\"verdict\": \"complete failure\""));
    }

    /// Test that a missing configuration file exits with 3
    #[test]
    fn test_missing_config_exit_code() {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::write(temp_dir.path().join("package.json"), PACKAGE_JSON).unwrap();

        depshift()
            .arg(temp_dir.path())
            .assert()
            .code(3)
            .stderr(predicate::str::contains("Error:"));
    }

    /// Test that conflicting scope flags are rejected by argument parsing
    #[test]
    fn test_conflicting_scope_flags() {
        let temp_dir = create_test_project("true");

        depshift()
            .args(["--major", "--patch"])
            .arg(temp_dir.path())
            .assert()
            .failure()
            .stderr(predicate::str::contains("--patch"));
    }

    /// Test that a declined confirmation applies nothing
    #[test]
    fn test_confirmation_declined() {
        let temp_dir = create_test_project("echo changed > package.json");

        depshift()
            .arg(temp_dir.path())
            .write_stdin("n\n")
            .assert()
            .code(0)
            .stdout(predicate::str::contains("cancelled by user"))
            .stderr(predicate::str::contains("[y/N]"));

        let after = fs::read_to_string(temp_dir.path().join("package.json")).unwrap();
        assert_eq!(after, PACKAGE_JSON);
    }
}

mod cli_tests {
    use super::*;

    #[test]
    fn test_help() {
        depshift()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("--dry-run"))
            .stdout(predicate::str::contains("--system-test-mode"));
    }

    #[test]
    fn test_version() {
        depshift()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
    }
}
