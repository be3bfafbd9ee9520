//! Incremental update patterns
//!
//! A pattern containing regex metacharacters is compiled as a regex,
//! anything else must match the package name exactly.

use crate::error::ConfigError;
use regex::Regex;

const REGEX_META: &[char] = &[
    '\\', '.', '+', '*', '?', '(', ')', '|', '[', ']', '{', '}', '^', '$',
];

/// Returns true if any rule or global pattern selects the package
pub fn is_incremental(
    package: &str,
    rule_patterns: &[String],
    global_patterns: &[String],
) -> Result<bool, ConfigError> {
    for pattern in rule_patterns.iter().chain(global_patterns) {
        if pattern_matches(pattern, package)? {
            return Ok(true);
        }
    }
    Ok(false)
}

fn pattern_matches(pattern: &str, package: &str) -> Result<bool, ConfigError> {
    let pattern = pattern.trim();
    if pattern.is_empty() {
        return Ok(false);
    }
    if !pattern.contains(REGEX_META) {
        return Ok(pattern == package);
    }
    let regex = Regex::new(pattern)
        .map_err(|e| ConfigError::invalid_pattern(pattern, e.to_string()))?;
    Ok(regex.is_match(package))
}
