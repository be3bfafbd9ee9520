//! Manifest-based package resolver
//!
//! Handles:
//! - JSON manifests (`package.json`, `composer.json`) with object sections
//! - TOML manifests (`Cargo.toml`, `pyproject.toml`) with dotted table paths
//! - Line-based manifests (`requirements.txt`)
//! - Installed versions reported by the rule's lock command

use super::PackageResolver;
use crate::command::{render_template, CancelSignal, CommandRequest, CommandRunner, TemplateVars};
use crate::config::{
    ManifestFormat, ProjectConfig, RuleConfig, RunConfig, DEFAULT_COMMAND_TIMEOUT_SECS,
};
use crate::domain::{DeclaredVersion, InstallStatus, Package, PackageType};
use crate::error::{AppError, ConfigError};
use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::{Arc, LazyLock};
use tracing::{debug, warn};

static REQUIREMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z0-9][A-Za-z0-9._\-]*)(?:\[[^\]]*\])?\s*(.*)$").unwrap()
});

/// A dependency as written in a manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredEntry {
    pub name: String,
    pub package_type: PackageType,
    pub requirement: String,
}

/// Resolves packages from manifest files and optional lock commands
pub struct ManifestResolver {
    runner: Arc<dyn CommandRunner>,
}

impl ManifestResolver {
    /// Creates a resolver that runs lock commands through `runner`
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    async fn resolve_rule(
        &self,
        rule_name: &str,
        rule: &RuleConfig,
        run: &RunConfig,
        cancel: &CancelSignal,
    ) -> Result<Vec<Package>, AppError> {
        let manifest_path = rule.manifest_path(&run.working_dir);
        let content = std::fs::read_to_string(&manifest_path)
            .map_err(|e| ConfigError::read_error(&manifest_path, e))?;
        let entries = parse_manifest(&content, rule.format, &rule.fields, &manifest_path)?;

        let lock_files_missing =
            !rule.lock_files.is_empty() && !rule.has_lock_file(&run.working_dir);
        let installed = match &rule.lock {
            Some(lock) if !lock.commands.trim().is_empty() && !lock_files_missing => {
                Some(self.installed_versions(rule_name, rule, run, cancel).await?)
            }
            _ => None,
        };

        let manager = rule.manager_for(rule_name);
        let packages = entries
            .into_iter()
            .map(|entry| {
                let declared = DeclaredVersion::parse(&entry.requirement);
                let mut package =
                    Package::new(rule_name, &entry.name, &declared.operator, &declared.version)
                        .with_type(entry.package_type)
                        .with_package_manager(manager)
                        .with_manifest(&manifest_path);

                let status = if rule.is_ignored(&entry.name) {
                    InstallStatus::Ignored
                } else if declared.version.is_empty() {
                    InstallStatus::VersionMissing
                } else if package.is_floating() {
                    InstallStatus::Floating
                } else if lock_files_missing {
                    InstallStatus::LockMissing
                } else if let Some(installed) = &installed {
                    match installed.get(&entry.name) {
                        Some(version) => {
                            package = package.with_installed(version);
                            InstallStatus::LockFound
                        }
                        None => InstallStatus::NotInLock,
                    }
                } else {
                    InstallStatus::NotConfigured
                };
                package.with_status(status)
            })
            .collect::<Vec<_>>();

        debug!(rule = rule_name, count = packages.len(), "resolved packages");
        Ok(packages)
    }

    async fn installed_versions(
        &self,
        rule_name: &str,
        rule: &RuleConfig,
        run: &RunConfig,
        cancel: &CancelSignal,
    ) -> Result<HashMap<String, String>, AppError> {
        let Some(lock) = &rule.lock else {
            return Ok(HashMap::new());
        };
        let vars = TemplateVars {
            rule: rule_name,
            ..Default::default()
        };
        let script = render_template(&lock.commands, &vars)?;
        let request = CommandRequest::new(script, &run.working_dir)
            .with_env(lock.env.clone())
            .with_timeout(run.timeout(lock.timeout_seconds, DEFAULT_COMMAND_TIMEOUT_SECS));
        let output = self.runner.run(&request, cancel).await?;

        let parsed = parse_installed(&output.stdout);
        if parsed.is_empty() {
            warn!(rule = rule_name, "lock command reported no installed versions");
        }
        Ok(parsed)
    }
}

#[async_trait]
impl PackageResolver for ManifestResolver {
    async fn resolve(
        &self,
        config: &ProjectConfig,
        run: &RunConfig,
        cancel: &CancelSignal,
    ) -> Result<Vec<Package>, AppError> {
        let mut packages = Vec::new();
        for (name, rule) in &config.rules {
            if !run.filter.should_process_rule(name) {
                debug!(rule = %name, "rule filtered out");
                continue;
            }
            packages.extend(self.resolve_rule(name, rule, run, cancel).await?);
        }
        Ok(packages)
    }
}

/// Parses the dependency sections of a manifest
///
/// Without configured fields, JSON manifests read `dependencies` and
/// `devDependencies`, TOML manifests read `dependencies` and
/// `dev-dependencies`, and line-based manifests treat every line as prod.
pub fn parse_manifest(
    content: &str,
    format: ManifestFormat,
    fields: &BTreeMap<String, PackageType>,
    path: &Path,
) -> Result<Vec<DeclaredEntry>, ConfigError> {
    match format {
        ManifestFormat::Json => {
            let json: Value = serde_json::from_str(content)
                .map_err(|e| ConfigError::parse_error(path, e.to_string()))?;
            let fields = fields_or(fields, &[("dependencies", PackageType::Prod), ("devDependencies", PackageType::Dev)]);
            Ok(collect_sections(&json, &fields))
        }
        ManifestFormat::Toml => {
            let table: toml::Value = toml::from_str(content)
                .map_err(|e| ConfigError::parse_error(path, e.to_string()))?;
            let json = serde_json::to_value(table)
                .map_err(|e| ConfigError::parse_error(path, e.to_string()))?;
            let fields = fields_or(fields, &[("dependencies", PackageType::Prod), ("dev-dependencies", PackageType::Dev)]);
            Ok(collect_sections(&json, &fields))
        }
        ManifestFormat::Lines => Ok(parse_lines(content)),
    }
}

fn fields_or(
    fields: &BTreeMap<String, PackageType>,
    defaults: &[(&str, PackageType)],
) -> Vec<(String, PackageType)> {
    if fields.is_empty() {
        defaults
            .iter()
            .map(|(name, t)| (name.to_string(), *t))
            .collect()
    } else {
        fields.iter().map(|(k, v)| (k.clone(), *v)).collect()
    }
}

fn collect_sections(root: &Value, fields: &[(String, PackageType)]) -> Vec<DeclaredEntry> {
    let mut entries = Vec::new();
    for (section, package_type) in fields {
        let Some(deps) = lookup_path(root, section).and_then(Value::as_object) else {
            continue;
        };
        for (name, value) in deps {
            // Table entries such as `{ version = "1.0", features = [...] }`
            let requirement = match value {
                Value::String(s) => s.clone(),
                Value::Object(map) => match map.get("version").and_then(Value::as_str) {
                    Some(v) => v.to_string(),
                    None => continue,
                },
                _ => continue,
            };
            entries.push(DeclaredEntry {
                name: name.clone(),
                package_type: *package_type,
                requirement,
            });
        }
    }
    entries
}

/// Follows a dotted key path such as `tool.poetry.dependencies`
pub(crate) fn lookup_path<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    if let Some(value) = root.get(path) {
        return Some(value);
    }
    path.split('.')
        .filter(|p| !p.is_empty())
        .try_fold(root, |current, key| current.get(key))
}

fn parse_lines(content: &str) -> Vec<DeclaredEntry> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with('-'))
        .filter_map(|line| {
            let caps = REQUIREMENT_RE.captures(line)?;
            let name = caps.get(1)?.as_str().to_string();
            let rest = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
            // Drop comments and environment markers, keep the first specifier
            let rest = rest.split(['#', ';']).next().unwrap_or_default();
            let requirement = rest.split(',').next().unwrap_or_default().trim().to_string();
            Some(DeclaredEntry {
                name,
                package_type: PackageType::Prod,
                requirement,
            })
        })
        .collect()
}

/// Parses lock command output into name -> installed version
///
/// Accepts `{"name": "1.0.0"}`, `{"name": {"version": "1.0.0"}}` (optionally
/// under a top-level `dependencies` key) and `[{"name": .., "version": ..}]`.
fn parse_installed(stdout: &str) -> HashMap<String, String> {
    let mut installed = HashMap::new();
    let Ok(json) = serde_json::from_str::<Value>(stdout.trim()) else {
        return installed;
    };

    let root = match json.get("dependencies") {
        Some(deps) if deps.is_object() => deps,
        _ => &json,
    };

    match root {
        Value::Object(map) => {
            for (name, value) in map {
                let version = match value {
                    Value::String(s) => Some(s.as_str()),
                    Value::Object(inner) => inner.get("version").and_then(Value::as_str),
                    _ => None,
                };
                if let Some(version) = version {
                    installed.insert(name.clone(), version.to_string());
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                let name = item.get("name").and_then(Value::as_str);
                let version = item.get("version").and_then(Value::as_str);
                if let (Some(name), Some(version)) = (name, version) {
                    installed.insert(name.to_string(), version.to_string());
                }
            }
        }
        _ => {}
    }
    installed
}
