//! Declared version constraints
//!
//! Handles constraint operators as they appear in manifests:
//! - Caret / tilde ranges: `^1.2.3`, `~1.2.3`, `~=1.2` (Python compatible release)
//! - Comparisons: `>=1.0.0`, `>1.0`, `<=2`, `<2.0.0`
//! - Exact pins: `1.2.3`, `=1.2.3`, `==1.2.3`
//! - Floating requirements: `*`, `latest`, `1.x`, `1.2.*`

use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of constraint declared for a dependency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintKind {
    /// Exact/pinned version (`1.2.3`, `=1.2.3`, `==1.2.3`)
    Exact,
    /// Caret range (`^1.2.3`), compatible with the major version
    Caret,
    /// Tilde range (`~1.2.3`, `~=1.2.3`), compatible with the minor version
    Tilde,
    /// Greater than or equal (`>=1.2.3`)
    GreaterOrEqual,
    /// Greater than (`>1.2.3`)
    Greater,
    /// Less than or equal (`<=1.2.3`)
    LessOrEqual,
    /// Less than (`<1.2.3`)
    Less,
    /// No fixed anchor (`*`, `latest`, `1.x`)
    Floating,
}

impl ConstraintKind {
    /// Classifies an operator string and its version
    pub fn classify(operator: &str, version: &str) -> Self {
        if is_floating_version(version) {
            return ConstraintKind::Floating;
        }
        match operator.trim() {
            "^" => ConstraintKind::Caret,
            "~" | "~=" => ConstraintKind::Tilde,
            ">=" => ConstraintKind::GreaterOrEqual,
            ">" => ConstraintKind::Greater,
            "<=" => ConstraintKind::LessOrEqual,
            "<" => ConstraintKind::Less,
            _ => ConstraintKind::Exact,
        }
    }

    /// Returns true for exact pins
    pub fn is_exact(&self) -> bool {
        matches!(self, ConstraintKind::Exact)
    }
}

/// Operators recognised at the start of a declared version, longest first
const OPERATORS: &[&str] = &[">=", "<=", "==", "~=", "^", "~", ">", "<", "="];

/// A declared version split into its operator and version number
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclaredVersion {
    /// The operator prefix (empty when none is declared)
    pub operator: String,
    /// The version number without operator
    pub version: String,
}

impl DeclaredVersion {
    /// Splits a raw declared version such as `^17.0.0` or `>= 2.28`
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        for op in OPERATORS {
            if let Some(rest) = trimmed.strip_prefix(op) {
                return Self {
                    operator: (*op).to_string(),
                    version: rest.trim().to_string(),
                };
            }
        }
        Self {
            operator: String::new(),
            version: trimmed.to_string(),
        }
    }

    /// Returns the constraint kind
    pub fn kind(&self) -> ConstraintKind {
        ConstraintKind::classify(&self.operator, &self.version)
    }
}

impl fmt::Display for DeclaredVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.operator, self.version)
    }
}

/// Returns true if a declared version floats instead of naming a release
pub fn is_floating_version(version: &str) -> bool {
    let v = version.trim();
    if v == "*" || v.eq_ignore_ascii_case("latest") || v.eq_ignore_ascii_case("x") {
        return true;
    }
    v.contains(".*") || v.contains(".x") || v.contains(".X") || v.ends_with('*')
}

/// Counts the dotted segments of a version, capped at three
pub fn version_segments(version: &str) -> usize {
    let cleaned = version.trim().trim_start_matches('v');
    cleaned
        .split('.')
        .filter(|part| !part.trim().is_empty())
        .count()
        .min(3)
}
