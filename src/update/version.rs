//! Lenient version parsing and comparison
//!
//! Package managers publish versions that are not always strict SemVer
//! (`v1.2`, `2.28`, `1.0.0rc1`, `1.2.3.4`). Strict strings go through the
//! `semver` crate; everything else is normalised first.

use semver::{Prerelease, Version};
use std::cmp::Ordering;

/// Markers treated as pre-release when a version cannot be parsed
const PRERELEASE_MARKERS: &[&str] = &[
    "alpha", "beta", "rc", "dev", "canary", "preview", "snapshot", "nightly", "pre",
];

/// Parses a version leniently
///
/// Returns `None` when no numeric major component is present.
pub fn parse_version(raw: &str) -> Option<Version> {
    let s = raw.trim().trim_start_matches(['v', 'V']);
    if s.is_empty() {
        return None;
    }
    if let Ok(version) = Version::parse(s) {
        return Some(version);
    }

    // Drop build metadata, then split the numeric core from any suffix
    let s = s.split('+').next().unwrap_or_default();
    let core_end = s
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(s.len());
    let (core, suffix) = s.split_at(core_end);

    let mut parts = core.split('.').filter(|p| !p.is_empty());
    let major: u64 = parts.next()?.parse().ok()?;
    let minor: u64 = parts.next().map(str::parse).transpose().ok()?.unwrap_or(0);
    let patch: u64 = parts.next().map(str::parse).transpose().ok()?.unwrap_or(0);

    let mut version = Version::new(major, minor, patch);
    let pre: String = suffix
        .trim_start_matches(['-', '.', '_'])
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' { c } else { '.' })
        .collect();
    let pre = pre
        .split('.')
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(".");
    if !pre.is_empty() {
        version.pre = Prerelease::new(&pre).ok()?;
    }
    Some(version)
}

/// Compares two version strings
///
/// Parsed versions compare by SemVer precedence. Unparseable input falls
/// back to comparing the numeric parts in order.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    if let (Some(va), Some(vb)) = (parse_version(a), parse_version(b)) {
        return va.cmp_precedence(&vb);
    }

    let numeric_parts = |s: &str| -> Vec<u64> {
        s.trim_start_matches('v')
            .split(['.', '-'])
            .filter_map(|p| p.parse().ok())
            .collect()
    };
    numeric_parts(a).cmp(&numeric_parts(b))
}

/// Returns true for alpha, beta, rc, dev, canary and similar versions
pub fn is_prerelease_version(version: &str) -> bool {
    match parse_version(version) {
        Some(parsed) => !parsed.pre.is_empty(),
        None => {
            let lower = version.to_ascii_lowercase();
            PRERELEASE_MARKERS.iter().any(|m| lower.contains(m))
        }
    }
}
