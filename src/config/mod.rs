//! Project configuration
//!
//! This module provides:
//! - `depshift.toml` loading and validation (rules, groups, system tests)
//! - The immutable per-invocation `RunConfig`
//! - Incremental update pattern matching

mod incremental;
mod rule;
mod run;

pub use incremental::is_incremental;
pub use rule::{
    GroupConfig, LockConfig, ManifestFormat, OutdatedConfig, RuleConfig, UpdateConfig,
    VersionListFormat,
};
pub use run::{RunConfig, DEFAULT_COMMAND_TIMEOUT_SECS};
pub use system_tests::{RunMode, SystemTestConfig, SystemTestsConfig, DEFAULT_TEST_TIMEOUT_SECS};

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default configuration file name, looked up in the working directory
pub const CONFIG_FILE_NAME: &str = "depshift.toml";

/// Contents of `depshift.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Rules keyed by name
    #[serde(default)]
    pub rules: BTreeMap<String, RuleConfig>,
    /// Package name patterns updated incrementally for every rule
    #[serde(default)]
    pub incremental: Vec<String>,
    /// System test settings
    #[serde(default)]
    pub system_tests: Option<SystemTestsConfig>,
}

impl ProjectConfig {
    /// Config file path: the explicit one, else `depshift.toml` in the working directory
    pub fn locate(working_dir: &Path, explicit: Option<&Path>) -> PathBuf {
        match explicit {
            Some(path) if path.is_absolute() => path.to_path_buf(),
            Some(path) => working_dir.join(path),
            None => working_dir.join(CONFIG_FILE_NAME),
        }
    }

    /// Loads and validates a config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::not_found(path));
        }
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_error(path, e))?;
        let config = Self::parse(&content, path)?;
        debug!(
            path = %path.display(),
            rules = config.rules.len(),
            "loaded configuration"
        );
        Ok(config)
    }

    /// Parses and validates config content
    pub fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        let config: ProjectConfig =
            toml::from_str(content).map_err(|e| ConfigError::parse_error(path, e.to_string()))?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<(), ConfigError> {
        if self.rules.is_empty() {
            return Err(ConfigError::NoRules {
                path: path.to_path_buf(),
            });
        }
        for (name, rule) in &self.rules {
            if rule.manifest.trim().is_empty() {
                return Err(ConfigError::invalid_value(
                    format!("rules.{}.manifest", name),
                    "must not be empty",
                ));
            }
        }
        if let Some(tests) = &self.system_tests {
            for (i, test) in tests.tests.iter().enumerate() {
                if test.name.trim().is_empty() {
                    return Err(ConfigError::invalid_value(
                        format!("system_tests.tests[{}].name", i),
                        "must not be empty",
                    ));
                }
                if test.commands.trim().is_empty() {
                    return Err(ConfigError::invalid_value(
                        format!("system_tests.tests[{}].commands", i),
                        format!("test '{}' has no commands", test.name),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Returns a rule by name
    pub fn rule(&self, name: &str) -> Option<&RuleConfig> {
        self.rules.get(name)
    }

    /// System test settings, defaulting to none configured
    pub fn system_tests(&self) -> SystemTestsConfig {
        self.system_tests.clone().unwrap_or_default()
    }
}
