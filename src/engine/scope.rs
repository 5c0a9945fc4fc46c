use super::matcher::ScopeMatcher;
use rustc_hash::FxHashSet;
use serde::Serialize;

/// Why a token was left out of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rejection {
    /// Fails the domain, IP or URL grammar.
    Malformed,
    /// Literal blacklist hit, or associated with a blacklisted IP.
    Blacklisted,
    OutOfScope,
    NotInScope,
    /// Relative URL without a hostname, or override and parsed host disagree.
    AmbiguousHost,
}

/// A program's scope and blacklist as read at the start of a batch.
///
/// Treated as immutable for the batch; scope expansions discovered while
/// normalizing are returned to the caller and only applied afterwards.
#[derive(Debug, Clone, Default)]
pub struct ScopeSnapshot {
    pub inscope: Vec<String>,
    pub outscope: Vec<String>,
    pub blacklist: Vec<String>,
    inscope_matcher: ScopeMatcher,
    outscope_matcher: ScopeMatcher,
    blacklist_set: FxHashSet<String>,
}

impl ScopeSnapshot {
    pub fn new(inscope: Vec<String>, outscope: Vec<String>, blacklist: Vec<String>) -> Self {
        let inscope_matcher = ScopeMatcher::new(&inscope);
        let outscope_matcher = ScopeMatcher::new(&outscope);
        let blacklist_set = blacklist.iter().cloned().collect();
        Self {
            inscope,
            outscope,
            blacklist,
            inscope_matcher,
            outscope_matcher,
            blacklist_set,
        }
    }

    pub fn is_blacklisted(&self, value: &str) -> bool {
        self.blacklist_set.contains(value)
    }

    pub fn is_inscope(&self, host: &str) -> bool {
        self.inscope_matcher.matches(host)
    }

    pub fn is_outscope(&self, host: &str) -> bool {
        self.outscope_matcher.matches(host)
    }

    /// Outscope wins over inscope; a host must be matched by some inscope
    /// pattern to be admitted.
    pub fn admit_host(&self, host: &str) -> Result<(), Rejection> {
        if self.is_outscope(host) {
            return Err(Rejection::OutOfScope);
        }
        if !self.is_inscope(host) {
            return Err(Rejection::NotInScope);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeDirection {
    In,
    Out,
}

/// Post-processing applied to a scope listing.
///
/// `wildcard_only` keeps only `*.` patterns, stripped of the prefix.
/// `top_level_only` (meaningful with `wildcard_only`) drops every suffix that
/// is a strict subdomain of another retained suffix.
pub fn filter_scope(patterns: Vec<String>, wildcard_only: bool, top_level_only: bool) -> Vec<String> {
    let mut seen = FxHashSet::default();
    let patterns: Vec<String> = patterns
        .into_iter()
        .filter(|p| seen.insert(p.clone()))
        .collect();

    if !wildcard_only {
        return patterns;
    }

    let suffixes: Vec<String> = patterns
        .iter()
        .filter_map(|p| p.strip_prefix("*.").map(str::to_string))
        .collect();

    if !top_level_only {
        return suffixes;
    }

    suffixes
        .iter()
        .filter(|candidate| {
            !suffixes
                .iter()
                .any(|parent| parent != *candidate && candidate.ends_with(&format!(".{}", parent)))
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_admit_host_precedence() {
        let snapshot = ScopeSnapshot::new(
            strings(&["*.example.com"]),
            strings(&["admin.example.com"]),
            vec![],
        );
        assert_eq!(snapshot.admit_host("www.example.com"), Ok(()));
        assert_eq!(
            snapshot.admit_host("admin.example.com"),
            Err(Rejection::OutOfScope)
        );
        assert_eq!(snapshot.admit_host("example.com"), Err(Rejection::NotInScope));
        assert_eq!(snapshot.admit_host("other.org"), Err(Rejection::NotInScope));
    }

    #[test]
    fn test_filter_scope_wildcard_and_top() {
        let scope = strings(&[
            "*.example.com",
            "*.api.example.com",
            "static.example.com",
            "*.other.org",
            "*.example.com",
            "*.badexample.com",
        ]);

        assert_eq!(filter_scope(scope.clone(), false, false).len(), 5);
        assert_eq!(
            filter_scope(scope.clone(), true, false),
            strings(&["example.com", "api.example.com", "other.org", "badexample.com"])
        );
        assert_eq!(
            filter_scope(scope, true, true),
            strings(&["example.com", "other.org", "badexample.com"])
        );
    }
}
