//! Route matching logic.
//!
//! # Responsibilities
//! - Match path prefixes on segment boundaries
//!
//! # Design Decisions
//! - Path matching is case-sensitive
//! - `/app` matches `/app`, `/app/` and `/app/x` but never `/apple`
//! - `/` matches every path
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

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// True for the residual `/` prefix, which matches everything.
    pub fn is_residual(&self) -> bool {
        self.prefix == "/"
    }

    pub fn matches_path(&self, path: &str) -> bool {
        if self.is_residual() {
            return true;
        }
        match path.strip_prefix(self.prefix.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with('/') || self.prefix.ends_with('/'),
            None => false,
        }
    }

    /// The path with this prefix removed, always starting with `/`.
    pub fn strip<'a>(&self, path: &'a str) -> Option<std::borrow::Cow<'a, str>> {
        if !self.matches_path(path) {
            return None;
        }
        if self.is_residual() {
            return Some(path.into());
        }
        let rest = &path[self.prefix.len()..];
        if rest.starts_with('/') {
            Some(rest.into())
        } else {
            Some(format!("/{}", rest).into())
        }
    }
}
