//! Immutable per-invocation run configuration

use super::{RunMode, SystemTestsConfig};
use crate::cli::CliArgs;
use crate::domain::{ScopeLevel, UpdateScope};
use crate::error::ConfigError;
use crate::update::PackageFilter;
use std::path::PathBuf;
use std::time::Duration;

/// Default timeout for package manager commands
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 300;

/// Options for one run, built once from the CLI and passed by reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// Project directory
    pub working_dir: PathBuf,
    /// Explicit config file
    pub config_path: Option<PathBuf>,
    /// Version scope policy
    pub scope: UpdateScope,
    /// Package selection
    pub filter: PackageFilter,
    /// Plan only, run nothing
    pub dry_run: bool,
    /// Do not run lock commands or snapshot lock files
    pub skip_lock: bool,
    /// Keep processing units after a failure
    pub continue_on_fail: bool,
    /// Skip command availability checks
    pub skip_preflight: bool,
    /// Disable system tests entirely
    pub skip_system_tests: bool,
    /// Overrides the configured run mode
    pub system_test_mode: Option<RunMode>,
    /// Disable command timeouts
    pub no_timeout: bool,
    /// Do not ask for confirmation
    pub assume_yes: bool,
}

impl RunConfig {
    /// Creates a configuration with defaults for a working directory
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
            config_path: None,
            scope: UpdateScope::default(),
            filter: PackageFilter::default(),
            dry_run: false,
            skip_lock: false,
            continue_on_fail: false,
            skip_preflight: false,
            skip_system_tests: false,
            system_test_mode: None,
            no_timeout: false,
            assume_yes: false,
        }
    }

    /// Builds the configuration from parsed CLI arguments
    pub fn from_cli(args: &CliArgs) -> Result<Self, ConfigError> {
        let level = match (args.major, args.minor, args.patch) {
            (false, false, false) => None,
            (true, false, false) => Some(ScopeLevel::Major),
            (false, true, false) => Some(ScopeLevel::Minor),
            (false, false, true) => Some(ScopeLevel::Patch),
            _ => {
                return Err(ConfigError::ConflictingOptions {
                    message: "only one of --major, --minor and --patch may be given".to_string(),
                })
            }
        };

        let filter = PackageFilter::new()
            .with_rules(args.rule.clone())
            .with_types(args.package_type.clone())
            .with_package_managers(args.package_manager.clone())
            .with_names(args.name.clone())
            .with_groups(args.group.clone());

        Ok(Self {
            working_dir: args.path.clone(),
            config_path: args.config.clone(),
            scope: UpdateScope {
                level,
                incremental: args.incremental,
            },
            filter,
            dry_run: args.dry_run,
            skip_lock: args.skip_lock,
            continue_on_fail: args.continue_on_fail,
            skip_preflight: args.skip_preflight,
            skip_system_tests: args.skip_system_tests,
            system_test_mode: args.system_test_mode,
            no_timeout: args.no_timeout,
            assume_yes: args.yes,
        })
    }

    /// Sets the scope (builder pattern)
    pub fn with_scope(mut self, scope: UpdateScope) -> Self {
        self.scope = scope;
        self
    }

    /// Sets the filter (builder pattern)
    pub fn with_filter(mut self, filter: PackageFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Sets dry-run (builder pattern)
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Sets skip-lock (builder pattern)
    pub fn with_skip_lock(mut self, skip_lock: bool) -> Self {
        self.skip_lock = skip_lock;
        self
    }

    /// Sets continue-on-fail (builder pattern)
    pub fn with_continue_on_fail(mut self, continue_on_fail: bool) -> Self {
        self.continue_on_fail = continue_on_fail;
        self
    }

    /// Sets skip-preflight (builder pattern)
    pub fn with_skip_preflight(mut self, skip: bool) -> Self {
        self.skip_preflight = skip;
        self
    }

    /// Sets skip-system-tests (builder pattern)
    pub fn with_skip_system_tests(mut self, skip: bool) -> Self {
        self.skip_system_tests = skip;
        self
    }

    /// Sets the system test mode override (builder pattern)
    pub fn with_system_test_mode(mut self, mode: RunMode) -> Self {
        self.system_test_mode = Some(mode);
        self
    }

    /// Sets assume-yes (builder pattern)
    pub fn with_assume_yes(mut self, yes: bool) -> Self {
        self.assume_yes = yes;
        self
    }

    /// Run mode in effect: skip-system-tests beats the CLI override, which beats config
    pub fn effective_run_mode(&self, tests: &SystemTestsConfig) -> RunMode {
        if self.skip_system_tests || !tests.has_tests() {
            return RunMode::None;
        }
        self.system_test_mode.unwrap_or(tests.run_mode)
    }

    /// Timeout for a command, `None` when timeouts are disabled
    pub fn timeout(&self, configured_secs: Option<u64>, default_secs: u64) -> Option<Duration> {
        if self.no_timeout {
            return None;
        }
        Some(Duration::from_secs(configured_secs.unwrap_or(default_secs)))
    }
}
