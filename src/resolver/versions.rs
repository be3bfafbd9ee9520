//! Command-backed version source

use super::manifest::lookup_path;
use super::VersionSource;
use crate::command::{render_template, CancelSignal, CommandRequest, CommandRunner, TemplateVars};
use crate::config::{OutdatedConfig, RuleConfig, RunConfig, VersionListFormat};
use crate::domain::Package;
use crate::error::{AppError, ConfigError, UnsupportedError};
use crate::update::compare_versions;
use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use std::cmp::Ordering;
use std::sync::{Arc, LazyLock};
use tracing::debug;

/// Default timeout for version lookups
const DEFAULT_LOOKUP_TIMEOUT_SECS: u64 = 60;

static VERSION_TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?P<version>\bv?\d+(?:\.\d+)+(?:[-.]?[0-9A-Za-z]+(?:\.[0-9A-Za-z]+)*)?)").unwrap()
});

/// Lists versions by running the rule's `outdated` command
pub struct CommandVersionSource {
    runner: Arc<dyn CommandRunner>,
}

impl CommandVersionSource {
    /// Creates a version source that runs commands through `runner`
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl VersionSource for CommandVersionSource {
    async fn available_versions(
        &self,
        package: &Package,
        rule: &RuleConfig,
        run: &RunConfig,
        cancel: &CancelSignal,
    ) -> Result<Vec<String>, AppError> {
        let outdated = match &rule.outdated {
            Some(outdated) if !outdated.commands.trim().is_empty() => outdated,
            _ => {
                return Err(UnsupportedError::new(
                    "version lookup",
                    &package.name,
                    "no outdated command configured",
                )
                .into())
            }
        };

        let vars = TemplateVars {
            package: &package.name,
            version: package.current_version(),
            constraint: &package.constraint,
            package_type: package.package_type.as_str(),
            rule: &package.rule,
            with_all_deps: false,
        };
        let script = render_template(&outdated.commands, &vars)?;
        let request = CommandRequest::new(script, &run.working_dir)
            .with_env(outdated.env.clone())
            .with_timeout(run.timeout(outdated.timeout_seconds, DEFAULT_LOOKUP_TIMEOUT_SECS));
        let output = self.runner.run(&request, cancel).await?;

        let mut versions = extract_versions(&output.stdout, outdated)?;
        let reference = package.current_version();
        versions.retain(|v| compare_versions(v, reference) == Ordering::Greater);
        versions.sort_by(|a, b| compare_versions(a, b));
        versions.dedup_by(|a, b| compare_versions(a, b) == Ordering::Equal);

        debug!(package = %package.name, count = versions.len(), "newer versions found");
        Ok(versions)
    }
}

/// Extracts version strings from command output
pub fn extract_versions(stdout: &str, config: &OutdatedConfig) -> Result<Vec<String>, ConfigError> {
    match config.format {
        VersionListFormat::Json => Ok(extract_json(stdout, config.json_key.as_deref())),
        VersionListFormat::Raw => extract_raw(stdout, config.pattern.as_deref()),
    }
}

fn extract_json(stdout: &str, key: Option<&str>) -> Vec<String> {
    let Ok(json) = serde_json::from_str::<Value>(stdout.trim()) else {
        return Vec::new();
    };
    let node = match key.map(str::trim).filter(|k| !k.is_empty()) {
        Some(key) => match lookup_path(&json, key) {
            Some(node) => node,
            None => return Vec::new(),
        },
        None => &json,
    };

    let as_version = |value: &Value| -> Option<String> {
        match value {
            Value::String(s) => Some(s.clone()),
            Value::Object(map) => map.get("version").and_then(Value::as_str).map(String::from),
            _ => None,
        }
    };

    match node {
        Value::Array(items) => items.iter().filter_map(as_version).collect(),
        Value::Object(map) if !map.contains_key("version") => map.keys().cloned().collect(),
        other => as_version(other).into_iter().collect(),
    }
}

fn extract_raw(stdout: &str, pattern: Option<&str>) -> Result<Vec<String>, ConfigError> {
    let custom;
    let regex = match pattern.map(str::trim).filter(|p| !p.is_empty()) {
        Some(pattern) => {
            custom = Regex::new(pattern)
                .map_err(|e| ConfigError::invalid_pattern(pattern, e.to_string()))?;
            &custom
        }
        None => &*VERSION_TOKEN_RE,
    };

    Ok(regex
        .captures_iter(stdout)
        .filter_map(|caps| caps.name("version").or_else(|| caps.get(1)).or_else(|| caps.get(0)))
        .map(|m| m.as_str().trim().to_string())
        .filter(|v| !v.is_empty())
        .collect())
}
