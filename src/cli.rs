//! CLI argument parsing module for depshift

use crate::config::RunMode;
use crate::domain::PackageType;
use crate::output::OutputFormat;
use clap::{ArgAction, Parser};
use std::path::PathBuf;

/// Parse a package type: prod or dev
fn parse_package_type(s: &str) -> Result<PackageType, String> {
    match s.trim().to_ascii_lowercase().as_str() {
        "prod" | "production" => Ok(PackageType::Prod),
        "dev" | "development" => Ok(PackageType::Dev),
        other => Err(format!(
            "invalid package type '{}': expected 'prod' or 'dev'",
            other
        )),
    }
}

/// Parse a system test run mode
fn parse_run_mode(s: &str) -> Result<RunMode, String> {
    s.parse()
}

/// Parse an output format
fn parse_output_format(s: &str) -> Result<OutputFormat, String> {
    s.parse()
}

/// Dependency update orchestrator
#[derive(Parser, Debug, Clone)]
#[command(
    name = "depshift",
    version,
    about = "Update dependencies across package managers with system tests and rollback"
)]
pub struct CliArgs {
    /// Project directory (default: current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Configuration file (default: <DIR>/depshift.toml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    // General options
    /// Dry run mode - plan updates without running any command
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Do not run lock commands after updates
    #[arg(long)]
    pub skip_lock: bool,

    /// Apply updates without asking for confirmation
    #[arg(short, long)]
    pub yes: bool,

    /// Keep processing remaining packages after a failure
    #[arg(long)]
    pub continue_on_fail: bool,

    /// Disable command timeouts
    #[arg(long)]
    pub no_timeout: bool,

    /// Enable verbose output
    #[arg(long)]
    pub verbose: bool,

    /// Enable quiet mode - minimal output
    #[arg(short, long)]
    pub quiet: bool,

    // Scope
    /// Allow major version updates
    #[arg(long, conflicts_with_all = ["minor", "patch"])]
    pub major: bool,

    /// Limit updates to the current major version
    #[arg(long, conflicts_with = "patch")]
    pub minor: bool,

    /// Limit updates to the current minor version
    #[arg(long)]
    pub patch: bool,

    /// Advance one version at a time instead of jumping to the newest
    #[arg(long)]
    pub incremental: bool,

    // Validation
    /// Skip checking that configured commands are available
    #[arg(long)]
    pub skip_preflight: bool,

    /// Do not run any system test
    #[arg(long)]
    pub skip_system_tests: bool,

    /// Override when system tests run (none, preflight, after_each, after_all)
    #[arg(long, value_parser = parse_run_mode)]
    pub system_test_mode: Option<RunMode>,

    // Filters
    /// Only process these rules (comma separated, repeatable)
    #[arg(long, action = ArgAction::Append, value_delimiter = ',')]
    pub rule: Vec<String>,

    /// Only process these package types: prod, dev
    #[arg(long = "type", action = ArgAction::Append, value_delimiter = ',', value_parser = parse_package_type)]
    pub package_type: Vec<PackageType>,

    /// Only process these package managers
    #[arg(long, action = ArgAction::Append, value_delimiter = ',')]
    pub package_manager: Vec<String>,

    /// Only process these packages
    #[arg(long, action = ArgAction::Append, value_delimiter = ',')]
    pub name: Vec<String>,

    /// Only process these groups
    #[arg(long, action = ArgAction::Append, value_delimiter = ',')]
    pub group: Vec<String>,

    // Output options
    /// Output format: text, json, csv, xml
    #[arg(short, long, default_value = "text", value_parser = parse_output_format)]
    pub output: OutputFormat,
}

impl CliArgs {
    /// Check if a structured (machine-readable) output format was requested
    pub fn structured_output(&self) -> bool {
        self.output != OutputFormat::Text
    }
}
