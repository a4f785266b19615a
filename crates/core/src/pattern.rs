//! Operation-name pattern matching
//!
//! Supports three kinds of pattern:
//! 1. `*` on its own - matches every non-empty candidate
//! 2. Wildcard patterns (`Get*`, `Search?`) - anchored, case-insensitive
//! 3. Plain names - case-insensitive equality

use crate::error::ClassificationFailure;
use regex::{Regex, RegexBuilder};

/// Match `candidate` against `patterns`
///
/// Compiles the patterns on every call; use [`PatternSet`] when the same
/// patterns are checked repeatedly. A pattern that fails to compile never
/// matches.
pub fn matches<S: AsRef<str>>(candidate: &str, patterns: &[S]) -> bool {
    if candidate.is_empty() || patterns.is_empty() {
        return false;
    }

    patterns.iter().any(|pattern| {
        CompiledPattern::compile(pattern.as_ref())
            .map(|compiled| compiled.is_match(candidate))
            .unwrap_or(false)
    })
}

/// Precompiled set of operation patterns
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    patterns: Vec<CompiledPattern>,
}

impl PatternSet {
    /// Compile every pattern, failing on the first one that cannot be built
    pub fn compile<S: AsRef<str>>(patterns: &[S]) -> Result<Self, ClassificationFailure> {
        let patterns = patterns
            .iter()
            .map(|p| CompiledPattern::compile(p.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// True if any pattern matches a non-empty candidate
    pub fn matches(&self, candidate: &str) -> bool {
        if candidate.is_empty() {
            return false;
        }
        self.patterns.iter().any(|p| p.is_match(candidate))
    }

    /// True if the set contains the global wildcard
    ///
    /// Anonymous operations only match through this.
    pub fn has_global_wildcard(&self) -> bool {
        self.patterns
            .iter()
            .any(|p| matches!(p, CompiledPattern::Any))
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

#[derive(Debug, Clone)]
enum CompiledPattern {
    Any,
    Wildcard(Regex),
    Exact(String),
}

impl CompiledPattern {
    fn compile(pattern: &str) -> Result<Self, ClassificationFailure> {
        if pattern == "*" {
            return Ok(Self::Any);
        }

        if !pattern.contains(['*', '?']) {
            return Ok(Self::Exact(pattern.to_lowercase()));
        }

        let mut source = String::with_capacity(pattern.len() + 8);
        source.push('^');
        let mut literal = String::new();
        for ch in pattern.chars() {
            match ch {
                '*' | '?' => {
                    source.push_str(&regex::escape(&literal));
                    literal.clear();
                    source.push_str(if ch == '*' { ".*" } else { "." });
                }
                _ => literal.push(ch),
            }
        }
        source.push_str(&regex::escape(&literal));
        source.push('$');

        RegexBuilder::new(&source)
            .case_insensitive(true)
            .dot_matches_new_line(true)
            .build()
            .map(Self::Wildcard)
            .map_err(|source| ClassificationFailure::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            })
    }

    fn is_match(&self, candidate: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Wildcard(re) => re.is_match(candidate),
            Self::Exact(name) => candidate.to_lowercase() == *name,
        }
    }
}
