//! Command availability checks run before any update
//!
//! Every rule with pending updates must be able to start its commands. The
//! first word of each command segment is looked up with `which`; shell
//! builtins are skipped.

use crate::config::{ProjectConfig, RuleConfig};
use crate::domain::ExecutionUnit;
use crate::error::ConfigError;
use std::collections::BTreeSet;
use std::path::Path;
use tracing::debug;

const SHELL_BUILTINS: &[&str] = &[
    ".", ":", "[", "alias", "break", "cd", "command", "continue", "echo", "eval", "exec", "exit",
    "export", "false", "for", "if", "printf", "pwd", "read", "return", "set", "shift", "source",
    "test", "true", "type", "umask", "unset", "wait", "while", "until", "case", "then", "do",
    "done", "fi", "esac", "else", "elif", "{", "}", "(", ")",
];

/// Checks that every command used by the planned units can be started
pub fn validate_commands(
    units: &[ExecutionUnit],
    config: &ProjectConfig,
    working_dir: &Path,
    skip_lock: bool,
) -> Result<(), ConfigError> {
    let rules: BTreeSet<&str> = units.iter().filter_map(ExecutionUnit::rule).collect();
    for rule_name in rules {
        let Some(rule) = config.rule(rule_name) else {
            continue;
        };
        for script in rule_scripts(rule, skip_lock) {
            for program in programs(script) {
                if !is_available(&program, working_dir) {
                    return Err(ConfigError::CommandNotFound {
                        rule: rule_name.to_string(),
                        command: program,
                    });
                }
            }
        }
        debug!(rule = rule_name, "commands available");
    }
    Ok(())
}

fn rule_scripts(rule: &RuleConfig, skip_lock: bool) -> Vec<&str> {
    let mut scripts = Vec::new();
    if let Some(update) = &rule.update {
        scripts.push(update.commands.as_str());
        if !skip_lock {
            scripts.push(update.lock_commands.as_str());
        }
    }
    if let Some(outdated) = &rule.outdated {
        scripts.push(outdated.commands.as_str());
    }
    if let Some(lock) = &rule.lock {
        scripts.push(lock.commands.as_str());
    }
    scripts
}

/// Programs started by a script: the first word of every command segment
fn programs(script: &str) -> Vec<String> {
    let mut found = Vec::new();
    for line in script.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let segments = line
            .split("&&")
            .flat_map(|s| s.split("||"))
            .flat_map(|s| s.split([';', '|']));
        for segment in segments {
            let program = segment
                .split_whitespace()
                // Skip leading `VAR=value` assignments
                .find(|word| !(word.contains('=') && !word.starts_with('=')));
            let Some(program) = program else {
                continue;
            };
            if program.contains("{{") || SHELL_BUILTINS.contains(&program) {
                continue;
            }
            let program = program.trim_matches(|c| c == '"' || c == '\'').to_string();
            if !program.is_empty() && !found.contains(&program) {
                found.push(program);
            }
        }
    }
    found
}

/// Explicit paths resolve against the working directory, bare names against `PATH`
fn is_available(program: &str, working_dir: &Path) -> bool {
    which::which_in(program, std::env::var_os("PATH"), working_dir).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Package, PlannedAction};

    fn config(update: &str) -> ProjectConfig {
        ProjectConfig::parse(
            &format!(
                "[rules.npm]\nmanifest = \"package.json\"\n[rules.npm.update]\n{}",
                update
            ),
            Path::new("depshift.toml"),
        )
        .unwrap()
    }

    fn units() -> Vec<ExecutionUnit> {
        let mut unit = ExecutionUnit::new("react", None);
        unit.actions.push(PlannedAction::new(
            Package::new("npm", "react", "^", "17.0.0"),
            "17.0.2",
        ));
        vec![unit]
    }

    #[test]
    fn test_programs_from_script() {
        let script = "# comment\nFOO=1 npm install {{package}} && npm dedupe\ncd web; yarn build | tee log\n";
        assert_eq!(programs(script), vec!["npm", "yarn", "tee"]);
    }

    #[test]
    fn test_programs_skips_placeholders_and_builtins() {
        assert!(programs("{{package}} --version").is_empty());
        assert!(programs("echo hi; true; exit 0").is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_relative_path_resolves_against_working_dir() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::TempDir::new().unwrap();
        let script = dir.path().join("update.sh");
        std::fs::write(&script, "#!/bin/sh\n").unwrap();
        assert!(!is_available("./update.sh", dir.path()));

        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        assert!(is_available("./update.sh", dir.path()));
        assert!(!is_available("./missing.sh", dir.path()));
    }

    #[cfg(unix)]
    #[test]
    fn test_validate_commands_ok() {
        let config = config("commands = \"sh -c true\"\nlock_commands = \"true\"\n");
        assert!(validate_commands(&units(), &config, Path::new("."), false).is_ok());
    }

    #[test]
    fn test_validate_commands_missing() {
        let config = config("commands = \"definitely-not-a-real-program-xyz install\"\n");
        let err = validate_commands(&units(), &config, Path::new("."), false).unwrap_err();
        match err {
            ConfigError::CommandNotFound { rule, command } => {
                assert_eq!(rule, "npm");
                assert_eq!(command, "definitely-not-a-real-program-xyz");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_skip_lock_ignores_lock_commands() {
        let config = config(
            "commands = \"echo update\"\nlock_commands = \"definitely-not-a-real-program-xyz\"\n",
        );
        assert!(validate_commands(&units(), &config, Path::new("."), true).is_ok());
        assert!(validate_commands(&units(), &config, Path::new("."), false).is_err());
    }

    #[test]
    fn test_no_units_no_checks() {
        let config = config("commands = \"definitely-not-a-real-program-xyz\"\n");
        assert!(validate_commands(&[], &config, Path::new("."), false).is_ok());
    }
}
