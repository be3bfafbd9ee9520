//! Per-rule (package manager) configuration

use crate::domain::PackageType;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Manifest file format understood by the built-in resolver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ManifestFormat {
    /// JSON object sections (`package.json`, `composer.json`)
    #[default]
    Json,
    /// TOML tables (`Cargo.toml`, `pyproject.toml` tables)
    Toml,
    /// One requirement per line (`requirements.txt`)
    Lines,
}

/// Output format of the "outdated" command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionListFormat {
    /// JSON array of strings, optionally under `json_key`
    Json,
    /// Plain text scanned with `pattern`
    #[default]
    Raw,
}

/// Configuration for one rule
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleConfig {
    /// Package manager id, defaults to the rule name
    #[serde(default)]
    pub manager: Option<String>,
    /// Manifest file, relative to the working directory
    pub manifest: String,
    /// Manifest format
    #[serde(default)]
    pub format: ManifestFormat,
    /// Manifest section -> package type
    #[serde(default)]
    pub fields: BTreeMap<String, PackageType>,
    /// Lock file paths or simple `*` patterns, relative to the working directory
    #[serde(default)]
    pub lock_files: Vec<String>,
    /// Package names never updated
    #[serde(default)]
    pub ignore: Vec<String>,
    /// Package name patterns updated incrementally
    #[serde(default)]
    pub incremental: Vec<String>,
    /// Group template applied to packages without a named group
    #[serde(default)]
    pub group: Option<String>,
    /// Named groups
    #[serde(default)]
    pub groups: BTreeMap<String, GroupConfig>,
    /// Update and lock commands
    #[serde(default)]
    pub update: Option<UpdateConfig>,
    /// Command listing available versions
    #[serde(default)]
    pub outdated: Option<OutdatedConfig>,
    /// Command reporting installed versions
    #[serde(default)]
    pub lock: Option<LockConfig>,
}

/// Named group of packages updated atomically
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupConfig {
    /// Package names in the group
    #[serde(default)]
    pub packages: Vec<String>,
    /// Update with transitive dependencies
    #[serde(default)]
    pub with_all_dependencies: bool,
}

/// Update command configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateConfig {
    /// Update command template
    #[serde(default)]
    pub commands: String,
    /// Lock command template run after updates unless skip-lock
    #[serde(default)]
    pub lock_commands: String,
    /// Extra environment variables
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    /// Timeout in seconds
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
}

/// Configuration of the command listing available versions
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutdatedConfig {
    /// Command template
    #[serde(default)]
    pub commands: String,
    /// Extra environment variables
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    /// Output format
    #[serde(default)]
    pub format: VersionListFormat,
    /// Dotted path to the version array in JSON output
    #[serde(default)]
    pub json_key: Option<String>,
    /// Regex with a `version` named group for raw output
    #[serde(default)]
    pub pattern: Option<String>,
    /// Versions never selected
    #[serde(default)]
    pub exclude_versions: Vec<String>,
    /// Timeout in seconds
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
}

/// Configuration of the command reporting installed versions
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LockConfig {
    /// Command printing `{"name": "version"}` or `[{"name", "version"}]` JSON
    #[serde(default)]
    pub commands: String,
    /// Extra environment variables
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    /// Timeout in seconds
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
}

impl RuleConfig {
    /// Package manager id for a rule name
    pub fn manager_for<'a>(&'a self, rule: &'a str) -> &'a str {
        self.manager.as_deref().unwrap_or(rule)
    }

    /// Returns true if the package is ignored
    pub fn is_ignored(&self, package: &str) -> bool {
        self.ignore.iter().any(|name| name == package)
    }

    /// Finds the named group listing the package
    pub fn group_of(&self, package: &str) -> Option<(&str, &GroupConfig)> {
        self.groups
            .iter()
            .find(|(_, group)| group.packages.iter().any(|p| p == package))
            .map(|(name, group)| (name.as_str(), group))
    }

    /// Manifest path resolved against the working directory
    pub fn manifest_path(&self, working_dir: &Path) -> PathBuf {
        working_dir.join(&self.manifest)
    }

    /// Lock file paths resolved against the working directory
    ///
    /// Plain entries are returned even when the file does not exist yet so
    /// that a lock file created by an update can be removed on rollback.
    /// Entries containing `*` match existing files in their directory.
    pub fn lock_file_paths(&self, working_dir: &Path) -> Vec<PathBuf> {
        let mut paths = Vec::new();
        for pattern in &self.lock_files {
            if !pattern.contains('*') {
                paths.push(working_dir.join(pattern));
                continue;
            }
            let full = working_dir.join(pattern);
            let (Some(dir), Some(name)) = (full.parent(), full.file_name()) else {
                continue;
            };
            let Some(matcher) = wildcard_regex(&name.to_string_lossy()) else {
                continue;
            };
            let Ok(entries) = std::fs::read_dir(dir) else {
                continue;
            };
            let mut matched: Vec<PathBuf> = entries
                .filter_map(|e| e.ok())
                .filter(|e| matcher.is_match(&e.file_name().to_string_lossy()))
                .map(|e| e.path())
                .collect();
            matched.sort();
            paths.extend(matched);
        }
        paths.dedup();
        paths
    }

    /// Returns true if at least one configured lock file exists
    pub fn has_lock_file(&self, working_dir: &Path) -> bool {
        self.lock_file_paths(working_dir).iter().any(|p| p.exists())
    }
}

fn wildcard_regex(pattern: &str) -> Option<Regex> {
    let escaped = regex::escape(pattern).replace(r"\*", ".*");
    Regex::new(&format!("^{}$", escaped)).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn sample_rule() -> RuleConfig {
        toml::from_str(
            r#"
manifest = "package.json"
lock_files = ["package-lock.json"]
ignore = ["left-pad"]

[fields]
dependencies = "prod"
devDependencies = "dev"

[groups.react]
packages = ["react", "react-dom"]
with_all_dependencies = true
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_rule_defaults() {
        let rule = sample_rule();
        assert_eq!(rule.format, ManifestFormat::Json);
        assert_eq!(rule.manager_for("npm"), "npm");
        assert_eq!(rule.fields.get("devDependencies"), Some(&PackageType::Dev));
        assert!(rule.update.is_none());
    }

    #[test]
    fn test_is_ignored() {
        let rule = sample_rule();
        assert!(rule.is_ignored("left-pad"));
        assert!(!rule.is_ignored("react"));
    }

    #[test]
    fn test_group_of() {
        let rule = sample_rule();
        let (name, group) = rule.group_of("react-dom").unwrap();
        assert_eq!(name, "react");
        assert!(group.with_all_dependencies);
        assert!(rule.group_of("lodash").is_none());
    }

    #[test]
    fn test_lock_file_paths_plain_entries() {
        let dir = TempDir::new().unwrap();
        let rule = sample_rule();
        let paths = rule.lock_file_paths(dir.path());
        assert_eq!(paths, vec![dir.path().join("package-lock.json")]);
        assert!(!rule.has_lock_file(dir.path()));

        fs::write(dir.path().join("package-lock.json"), "{}").unwrap();
        assert!(rule.has_lock_file(dir.path()));
    }

    #[test]
    fn test_lock_file_paths_wildcard() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.lock"), "").unwrap();
        fs::write(dir.path().join("b.lock"), "").unwrap();
        fs::write(dir.path().join("c.txt"), "").unwrap();

        let rule = RuleConfig {
            manifest: "deps.txt".to_string(),
            lock_files: vec!["*.lock".to_string()],
            ..Default::default()
        };
        let paths = rule.lock_file_paths(dir.path());
        assert_eq!(
            paths,
            vec![dir.path().join("a.lock"), dir.path().join("b.lock")]
        );
    }
}
