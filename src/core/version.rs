//! Version ordering for `v`-prefixed semver strings.
//!
//! Registry versions look like `v1.2.3` or `v0.0.0-20200102030405-abcdef123456`.
//! The `semver` crate rejects the `v` prefix, so comparisons strip it first.
//! Anything that still fails to parse sorts below every valid version, with
//! byte order as the tie-break, which keeps sorting total.

use std::cmp::Ordering;

/// Compare two version strings in semver order.
pub fn compare(a: &str, b: &str) -> Ordering {
    let pa = parse(a);
    let pb = parse(b);
    match (pa, pb) {
        (Some(va), Some(vb)) => va.cmp(&vb),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => a.cmp(b),
    }
}

/// True when `a` is strictly newer than `b`.
pub fn is_newer(a: &str, b: &str) -> bool {
    compare(a, b) == Ordering::Greater
}

fn parse(v: &str) -> Option<semver::Version> {
    semver::Version::parse(v.strip_prefix('v').unwrap_or(v)).ok()
}
