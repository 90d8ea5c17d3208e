//! Module version helpers.

use semver::Version;
use std::cmp::Ordering;

/// The part of a module version an upstream host can address an archive by.
///
/// Pseudo-versions (`v0.0.0-20180111040409-fbec762f837d`) address a commit,
/// so the trailing hash is used. A `+incompatible` style build suffix is
/// dropped in both cases, since no host serves a commit by `hash+suffix`.
pub fn addressable_version(version: &str) -> &str {
    let fields: Vec<&str> = version.split('-').collect();
    let candidate = if fields.len() == 3 {
        fields[2]
    } else {
        version
    };
    match candidate.split_once('+') {
        Some((head, _)) => head,
        None => candidate,
    }
}

/// Parse a `v`-prefixed module version as semver.
pub fn parse_version(version: &str) -> Option<Version> {
    let trimmed = version.strip_prefix('v').unwrap_or(version);
    Version::parse(trimmed).ok()
}

/// Sort versions ascending by semver precedence.
///
/// Versions that do not parse sort after every valid one and keep their
/// relative order.
pub fn sort_versions(versions: &mut [String]) {
    versions.sort_by(|a, b| match (parse_version(a), parse_version(b)) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}
