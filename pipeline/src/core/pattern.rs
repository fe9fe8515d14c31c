//! Glob-style matching of output names against selection patterns.
//!
//! Only `*` is interpreted (any run of zero or more characters). A pattern
//! without a wildcard matches on exact equality; matching is case-sensitive
//! and anchored to the whole name.

use regex::Regex;

/// Check whether `name` matches `pattern`.
pub fn matches(name: &str, pattern: &str) -> bool {
    if pattern == "*" {
        return true;
    }
    if !pattern.contains('*') {
        return name == pattern;
    }

    let escaped = pattern
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*");
    // The escaped pattern cannot fail to compile: every literal segment is
    // regex-escaped and the joins are plain `.*`.
    let re = Regex::new(&format!("^{escaped}$")).expect("escaped glob should compile");
    re.is_match(name)
}
