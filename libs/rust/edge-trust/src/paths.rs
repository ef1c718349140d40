//! Public-path allowlists.
//!
//! A pattern is either an exact path (`/health`) or a prefix ending in `/**`
//! (`/api/auth/**`), which matches the prefix itself and anything below it on
//! a segment boundary.

/// Compiled allowlist of paths that bypass authentication.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublicPaths {
    exact: Vec<String>,
    prefixes: Vec<String>,
}

impl PublicPaths {
    /// Build from patterns.
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut paths = Self::default();
        for pattern in patterns {
            let pattern = pattern.as_ref().trim();
            if pattern.is_empty() {
                continue;
            }
            match pattern.strip_suffix("/**") {
                Some(prefix) => paths.prefixes.push(prefix.to_string()),
                None => paths.exact.push(pattern.to_string()),
            }
        }
        paths
    }

    /// Parse a comma-separated pattern list.
    #[must_use]
    pub fn parse(list: &str) -> Self {
        Self::new(list.split(','))
    }

    /// Whether `path` is public.
    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        if self.exact.iter().any(|p| p == path) {
            return true;
        }
        self.prefixes.iter().any(|prefix| {
            path.strip_prefix(prefix.as_str())
                .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
        })
    }

    /// Whether no pattern is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.exact.is_empty() && self.prefixes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match() {
        let paths = PublicPaths::parse("/health, /api/auth/login");
        assert!(paths.matches("/health"));
        assert!(paths.matches("/api/auth/login"));
        assert!(!paths.matches("/health/deep"));
        assert!(!paths.matches("/api/auth/logout"));
    }

    #[test]
    fn test_prefix_match_respects_segments() {
        let paths = PublicPaths::parse("/api/public/**");
        assert!(paths.matches("/api/public"));
        assert!(paths.matches("/api/public/courses/1"));
        assert!(!paths.matches("/api/publicity"));
        assert!(!paths.matches("/api/private"));
    }

    #[test]
    fn test_empty_list() {
        let paths = PublicPaths::parse("");
        assert!(paths.is_empty());
        assert!(!paths.matches("/"));
    }
}
