//! Version scope policy

use super::ConstraintKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Upper bound on how far a version may advance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeLevel {
    /// Any newer version
    Major,
    /// Same major version
    Minor,
    /// Same major and minor version
    Patch,
}

impl fmt::Display for ScopeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ScopeLevel::Major => "major",
            ScopeLevel::Minor => "minor",
            ScopeLevel::Patch => "patch",
        };
        f.write_str(s)
    }
}

/// Limit a candidate version must respect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeBound {
    /// Within a level of the reference version
    Level(ScopeLevel),
    /// At or below the declared version (`<=`)
    AtMost,
    /// Strictly below the declared version (`<`)
    Below,
}

impl ScopeBound {
    /// Derives the bound implied by a declared constraint
    ///
    /// `segments` is the number of dotted parts of the declared version; a
    /// partial pin such as `2.9` keeps its minor version, `2` its major.
    pub fn from_constraint(kind: ConstraintKind, segments: usize) -> Self {
        match kind {
            ConstraintKind::Caret => ScopeBound::Level(ScopeLevel::Minor),
            ConstraintKind::Tilde => ScopeBound::Level(ScopeLevel::Patch),
            ConstraintKind::Exact if segments <= 1 => ScopeBound::Level(ScopeLevel::Minor),
            ConstraintKind::Exact => ScopeBound::Level(ScopeLevel::Patch),
            ConstraintKind::LessOrEqual => ScopeBound::AtMost,
            ConstraintKind::Less => ScopeBound::Below,
            ConstraintKind::GreaterOrEqual | ConstraintKind::Greater | ConstraintKind::Floating => {
                ScopeBound::Level(ScopeLevel::Major)
            }
        }
    }
}

/// The scope flags active for a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UpdateScope {
    /// Level forced by `--major`/`--minor`/`--patch`
    pub level: Option<ScopeLevel>,
    /// Advance one version step at a time
    pub incremental: bool,
}

impl UpdateScope {
    /// Creates a scope with an explicit level
    pub fn new(level: ScopeLevel) -> Self {
        Self {
            level: Some(level),
            incremental: false,
        }
    }

    /// Enables incremental stepping (builder pattern)
    pub fn with_incremental(mut self, incremental: bool) -> Self {
        self.incremental = incremental;
        self
    }

    /// Bound that applies to a package; an explicit level replaces the constraint
    pub fn bound_for(&self, kind: ConstraintKind, segments: usize) -> ScopeBound {
        match self.level {
            Some(level) => ScopeBound::Level(level),
            None => ScopeBound::from_constraint(kind, segments),
        }
    }
}
