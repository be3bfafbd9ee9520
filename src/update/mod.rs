//! Update planning logic
//!
//! This module provides:
//! - Package filter configuration from CLI args
//! - Lenient version parsing and comparison
//! - The scope selector choosing one target version per package
//! - The planner turning resolved packages into execution units
//! - Drift checks against re-resolved packages after update and restore

mod drift;
mod filter;
mod planner;
mod selector;
mod version;

pub use drift::{check_restored, check_updated};
pub use filter::PackageFilter;
pub use planner::{resolve_group, Plan, UpdatePlanner};
pub use selector::{Selection, VersionScopeSelector};
pub use version::{compare_versions, is_prerelease_version, parse_version};
