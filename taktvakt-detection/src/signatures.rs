//! ## taktvakt-detection::signatures
//! **Aho-Corasick payload matching with thread-safe updates**
//!
//! Patterns and the compiled automaton sit behind one lock so a scan never
//! sees a matcher built from a different pattern list.

use aho_corasick::{AhoCorasick, AhoCorasickBuilder};
use parking_lot::RwLock;

use crate::error::DetectionError;

#[derive(Default)]
struct Compiled {
    patterns: Vec<String>,
    matcher: Option<AhoCorasick>,
}

#[derive(Default)]
pub struct SignatureEngine {
    compiled: RwLock<Compiled>,
}

impl SignatureEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_patterns<I, S>(patterns: I) -> Result<Self, DetectionError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let engine = Self::new();
        {
            let mut compiled = engine.compiled.write();
            compiled.patterns = patterns.into_iter().map(Into::into).collect();
            compiled.matcher = build(&compiled.patterns)?;
        }
        Ok(engine)
    }

    /// Adds a pattern and rebuilds the automaton.
    pub fn pattern_add(&self, pattern: &str) -> Result<(), DetectionError> {
        let mut compiled = self.compiled.write();
        let mut patterns = compiled.patterns.clone();
        patterns.push(pattern.to_string());
        compiled.matcher = build(&patterns)?;
        compiled.patterns = patterns;
        Ok(())
    }

    /// Indices of every (overlapping) match in `data`.
    pub fn buffer_scan(&self, data: &[u8]) -> Vec<usize> {
        let compiled = self.compiled.read();
        compiled.matcher.as_ref().map_or(Vec::new(), |matcher| {
            matcher
                .find_overlapping_iter(data)
                .map(|m| m.pattern().as_usize())
                .collect()
        })
    }

    /// First matching pattern, without allocating.
    #[inline]
    pub fn first_match(&self, data: &[u8]) -> Option<usize> {
        let compiled = self.compiled.read();
        compiled
            .matcher
            .as_ref()
            .and_then(|matcher| matcher.find(data))
            .map(|m| m.pattern().as_usize())
    }

    pub fn pattern(&self, index: usize) -> Option<String> {
        self.compiled.read().patterns.get(index).cloned()
    }

    pub fn len(&self) -> usize {
        self.compiled.read().patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn build(patterns: &[String]) -> Result<Option<AhoCorasick>, DetectionError> {
    if patterns.is_empty() {
        return Ok(None);
    }
    AhoCorasickBuilder::new()
        .build(patterns)
        .map(Some)
        .map_err(|e| DetectionError::PatternError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_matching() {
        let engine = SignatureEngine::new();
        engine.pattern_add("test").unwrap();

        assert!(!engine.buffer_scan(b"this is a test").is_empty());
        assert_eq!(engine.first_match(b"this is a test"), Some(0));
    }

    #[test]
    fn test_no_match() {
        let engine = SignatureEngine::with_patterns(["test"]).unwrap();
        assert!(engine.buffer_scan(b"no match here").is_empty());
        assert_eq!(engine.first_match(b"no match here"), None);
    }

    #[test]
    fn test_multiple_patterns() {
        let engine = SignatureEngine::with_patterns(["test", "example"]).unwrap();

        let matches = engine.buffer_scan(b"this is a test with an example");
        assert_eq!(matches.len(), 2);
        assert!(matches.contains(&0));
        assert!(matches.contains(&1));
        assert_eq!(engine.pattern(1).as_deref(), Some("example"));
    }

    #[test]
    fn empty_engine_matches_nothing() {
        let engine = SignatureEngine::new();
        assert!(engine.is_empty());
        assert_eq!(engine.first_match(b"anything"), None);
    }
}
