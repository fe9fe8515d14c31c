//! Resolution of which declared outputs run for a step invocation.
//!
//! Two selection specs exist per run, one for generation and one for
//! skipping. Each is either a flat pattern list applying to every step or a
//! mapping from step scope (a short id, or the wildcard scope `*`) to a
//! pattern list. Skip always wins over generate; a supplied generate spec is
//! exclusive (unnamed outputs are suppressed); only a fully absent generate
//! spec falls back to the declaration defaults.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::pattern::matches;
use crate::core::registry::OutputRegistry;

/// Scope key matching every step in a scoped spec.
pub const WILDCARD_SCOPE: &str = "*";

/// Patterns selecting outputs, either globally or per step scope.
///
/// Deserializes untagged: a TOML/JSON array is `Flat`, a table is `Scoped`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SelectionSpec {
    Flat(Vec<String>),
    Scoped(BTreeMap<String, Vec<String>>),
}

impl SelectionSpec {
    /// Resolve the pattern list applicable to `step_id`.
    ///
    /// Scoped specs contribute the exact-key patterns first, then the
    /// wildcard-scope patterns. Flat specs apply to every step as-is.
    pub fn patterns_for(&self, step_id: &str) -> Vec<&str> {
        match self {
            SelectionSpec::Flat(patterns) => patterns.iter().map(String::as_str).collect(),
            SelectionSpec::Scoped(scopes) => {
                let mut resolved = Vec::new();
                if let Some(patterns) = scopes.get(step_id) {
                    resolved.extend(patterns.iter().map(String::as_str));
                }
                if let Some(patterns) = scopes.get(WILDCARD_SCOPE) {
                    resolved.extend(patterns.iter().map(String::as_str));
                }
                resolved
            }
        }
    }
}

/// Decide whether output `name` of step `step_id` should be generated.
///
/// Precedence, in order: skip match -> `false`; generate spec supplied and a
/// pattern matches -> `true`; generate spec supplied but nothing matches
/// (including an empty spec, or a scoped spec with no patterns for this
/// step) -> `false`; no generate spec at all -> `enabled_by_default`.
pub fn should_generate(
    step_id: &str,
    name: &str,
    enabled_by_default: bool,
    generate: Option<&SelectionSpec>,
    skip: Option<&SelectionSpec>,
) -> bool {
    if let Some(skip) = skip
        && skip
            .patterns_for(step_id)
            .iter()
            .any(|pattern| matches(name, pattern))
    {
        return false;
    }

    match generate {
        Some(generate) => generate
            .patterns_for(step_id)
            .iter()
            .any(|pattern| matches(name, pattern)),
        None => enabled_by_default,
    }
}

/// Parse a comma-separated CLI pattern list (`--outputs` / `--skip-outputs`).
///
/// Entries may carry a `step:pattern` scope. Any scoped entry makes the
/// whole spec scoped; unscoped entries then land under the wildcard scope.
///
/// `"plot,stats"` -> flat; `"00:plot,01:*"` -> scoped; `"00:plot,stats"` ->
/// scoped with `stats` under `*`.
pub fn parse_pattern_arg(raw: &str) -> SelectionSpec {
    let entries: Vec<&str> = raw.split(',').map(str::trim).filter(|e| !e.is_empty()).collect();

    if !entries.iter().any(|e| e.contains(':')) {
        return SelectionSpec::Flat(entries.iter().map(|e| e.to_string()).collect());
    }

    let mut scopes: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for entry in entries {
        let (scope, pattern) = match entry.split_once(':') {
            Some((scope, pattern)) => (scope.trim(), pattern.trim()),
            None => (WILDCARD_SCOPE, entry),
        };
        scopes.entry(scope.to_string()).or_default().push(pattern.to_string());
    }
    SelectionSpec::Scoped(scopes)
}

/// Literal (wildcard-free) patterns that match no registered output name.
///
/// Returns `(scope, pattern)` pairs; a flat spec's patterns are checked
/// against every step and reported under the wildcard scope. Used for
/// warning-level notices only; an unmatched pattern is never fatal.
pub fn unmatched_literal_patterns(
    registry: &OutputRegistry,
    spec: &SelectionSpec,
) -> Vec<(String, String)> {
    let mut unmatched = Vec::new();
    match spec {
        SelectionSpec::Flat(patterns) => {
            for pattern in patterns.iter().filter(|p| !p.contains('*')) {
                let known = registry
                    .steps()
                    .iter()
                    .flat_map(|s| &s.declarations)
                    .any(|d| d.name == *pattern);
                if !known {
                    unmatched.push((WILDCARD_SCOPE.to_string(), pattern.clone()));
                }
            }
        }
        SelectionSpec::Scoped(scopes) => {
            for (scope, patterns) in scopes {
                for pattern in patterns.iter().filter(|p| !p.contains('*')) {
                    let known = registry
                        .steps()
                        .iter()
                        .filter(|s| scope == WILDCARD_SCOPE || s.step_id == *scope)
                        .flat_map(|s| &s.declarations)
                        .any(|d| d.name == *pattern);
                    if !known {
                        unmatched.push((scope.clone(), pattern.clone()));
                    }
                }
            }
        }
    }
    unmatched
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::registry::OutputDeclaration;

    fn scoped(entries: &[(&str, &[&str])]) -> SelectionSpec {
        SelectionSpec::Scoped(
            entries
                .iter()
                .map(|(scope, patterns)| {
                    (
                        scope.to_string(),
                        patterns.iter().map(|p| p.to_string()).collect(),
                    )
                })
                .collect(),
        )
    }

    fn flat(patterns: &[&str]) -> SelectionSpec {
        SelectionSpec::Flat(patterns.iter().map(|p| p.to_string()).collect())
    }

    #[test]
    fn default_applies_without_any_spec() {
        assert!(should_generate("00", "summary_plot", true, None, None));
        assert!(!should_generate("00", "debug_info", false, None, None));
    }

    #[test]
    fn skip_wins_over_generate_and_defaults() {
        let generate = flat(&["*"]);
        let skip = flat(&["debug_*"]);
        assert!(!should_generate(
            "00",
            "debug_info",
            false,
            Some(&generate),
            Some(&skip)
        ));
        assert!(should_generate(
            "00",
            "summary_plot",
            true,
            Some(&generate),
            Some(&skip)
        ));
    }

    #[test]
    fn supplied_generate_spec_is_exclusive() {
        let generate = scoped(&[("00", &["*plot*"])]);
        assert!(should_generate("00", "summary_plot", true, Some(&generate), None));
        // raw_table is enabled by default but unnamed, so it is suppressed.
        assert!(!should_generate("00", "raw_table", true, Some(&generate), None));
    }

    #[test]
    fn empty_generate_spec_matches_nothing() {
        let generate = flat(&[]);
        assert!(!should_generate("00", "summary_plot", true, Some(&generate), None));
    }

    #[test]
    fn scoped_generate_for_other_step_suppresses_this_step() {
        let generate = scoped(&[("01", &["*"])]);
        assert!(!should_generate("00", "summary_plot", true, Some(&generate), None));
    }

    #[test]
    fn exact_scope_and_wildcard_scope_are_both_consulted() {
        let generate = scoped(&[("00", &["stats"]), ("*", &["*plot*"])]);
        assert!(should_generate("00", "stats", false, Some(&generate), None));
        assert!(should_generate("00", "summary_plot", false, Some(&generate), None));
        assert!(should_generate("01", "summary_plot", false, Some(&generate), None));
        assert!(!should_generate("01", "stats", false, Some(&generate), None));
    }

    #[test]
    fn scoped_generate_with_wildcard_only_skip_scope() {
        // Conflicting scope keys: generate keyed by "00", skip keyed by "*".
        let generate = scoped(&[("00", &["*"])]);
        let skip = scoped(&[("*", &["debug_*"])]);
        assert!(!should_generate(
            "00",
            "debug_info",
            false,
            Some(&generate),
            Some(&skip)
        ));
        assert!(should_generate(
            "00",
            "summary_plot",
            true,
            Some(&generate),
            Some(&skip)
        ));
    }

    #[test]
    fn parse_without_scope_yields_flat_spec() {
        assert_eq!(parse_pattern_arg("plot,stats"), flat(&["plot", "stats"]));
    }

    #[test]
    fn parse_with_scope_yields_scoped_spec() {
        assert_eq!(
            parse_pattern_arg("01:plot,01:stats,02:*"),
            scoped(&[("01", &["plot", "stats"]), ("02", &["*"])])
        );
    }

    #[test]
    fn parse_mixed_entries_put_unscoped_under_wildcard() {
        assert_eq!(
            parse_pattern_arg("00:plot, stats"),
            scoped(&[("00", &["plot"]), ("*", &["stats"])])
        );
    }

    #[test]
    fn unmatched_literal_patterns_are_reported_per_scope() {
        let mut registry = OutputRegistry::new();
        registry
            .register("00", OutputDeclaration::new("summary_plot", "plot", true))
            .expect("register");

        let spec = scoped(&[("00", &["summary_plot", "missing"]), ("*", &["debug_*"])]);
        let unmatched = unmatched_literal_patterns(&registry, &spec);
        assert_eq!(unmatched, vec![("00".to_string(), "missing".to_string())]);

        let spec = flat(&["nope"]);
        let unmatched = unmatched_literal_patterns(&registry, &spec);
        assert_eq!(unmatched, vec![("*".to_string(), "nope".to_string())]);
    }
}
