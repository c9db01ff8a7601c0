//! Route matching logic.
//!
//! # Design Decisions
//! - Path matching is literal and case-sensitive
//! - No regex to guarantee O(n) matching

/// Matches the request path prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPrefixMatcher {
    prefix: String,
}

impl PathPrefixMatcher {
    /// Create a new path prefix matcher.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Returns true if `path` starts with this prefix.
    pub fn matches(&self, path: &str) -> bool {
        path.starts_with(&self.prefix)
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Prefix length, used to rank more specific routes first.
    pub fn specificity(&self) -> usize {
        self.prefix.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_matcher() {
        let matcher = PathPrefixMatcher::new("/api/");

        assert!(matcher.matches("/api/v1"));
        assert!(matcher.matches("/api/"));
        assert!(!matcher.matches("/api"));
        assert!(!matcher.matches("/images"));
        assert!(!matcher.matches("/API/v1"));
    }

    #[test]
    fn test_root_matches_everything() {
        let matcher = PathPrefixMatcher::new("/");
        assert!(matcher.matches("/"));
        assert!(matcher.matches("/anything/else"));
    }
}
