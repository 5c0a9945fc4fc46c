use rustc_hash::FxHashSet;

/// Scope pattern matcher built once per batch from a program's pattern list.
///
/// Literal patterns match by equality. A wildcard `*.<suffix>` matches any
/// strict subdomain of `<suffix>`, never the apex itself.
#[derive(Debug, Default, Clone)]
pub struct ScopeMatcher {
    literals: FxHashSet<Box<str>>,
    // Wildcard patterns stored without the leading `*.`
    suffixes: FxHashSet<Box<str>>,
}

impl ScopeMatcher {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Self {
        let mut literals = FxHashSet::default();
        let mut suffixes = FxHashSet::default();
        for pattern in patterns {
            let pattern = pattern.as_ref();
            if let Some(suffix) = pattern.strip_prefix("*.") {
                suffixes.insert(suffix.into());
            }
            // A wildcard pattern is also a literal, `*.example.com` == `*.example.com`
            literals.insert(pattern.into());
        }
        Self { literals, suffixes }
    }

    pub fn matches(&self, candidate: &str) -> bool {
        if self.literals.contains(candidate) {
            return true;
        }
        if self.suffixes.is_empty() {
            return false;
        }

        // Walk the strict suffixes: a.b.example.com -> b.example.com -> example.com -> com
        let mut part = candidate;
        while let Some(idx) = part.find('.') {
            part = &part[idx + 1..];
            if part.is_empty() {
                break;
            }
            if self.suffixes.contains(part) {
                return true;
            }
        }

        false
    }
}

/// One-shot form of [`ScopeMatcher::matches`].
pub fn matches_scope<S: AsRef<str>>(candidate: &str, patterns: &[S]) -> bool {
    patterns.iter().any(|pattern| {
        let pattern = pattern.as_ref();
        if pattern == candidate {
            return true;
        }
        match pattern.strip_prefix("*.") {
            Some(suffix) => candidate
                .strip_suffix(suffix)
                .is_some_and(|rest| rest.ends_with('.')),
            None => false,
        }
    })
}
