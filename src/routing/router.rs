//! Route lookup and request classification.
//!
//! # Responsibilities
//! - Store the ordered (prefix, destination) table
//! - Classify a request path into exactly one destination
//! - Return an explicit `Fallback` when nothing matches
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - Top-to-bottom scan, first match wins
//! - The residual `/` entry must be last; construction fails otherwise
//! - The API entry is always first, whatever the mode

use crate::config::{EdgeConfig, RoutingMode};
use crate::routing::matcher::PathPrefixMatcher;

/// The two front-end bundles behind the router.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bundle {
    /// React single-page application.
    React,
    /// Landing site, owner of the residual `/` prefix.
    Landing,
}

impl Bundle {
    pub fn as_str(self) -> &'static str {
        match self {
            Bundle::React => "react",
            Bundle::Landing => "landing",
        }
    }
}

/// Terminal handler a table entry points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    Api,
    Upstream(Bundle),
    Static(Bundle),
}

/// Outcome of classifying one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Api,
    Proxied(Bundle),
    StaticServed(Bundle),
    /// No entry matched. Unreachable while a residual entry exists.
    Fallback,
}

impl Classification {
    /// Label used in logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Classification::Api => "api",
            Classification::Proxied(Bundle::React) => "proxy_react",
            Classification::Proxied(Bundle::Landing) => "proxy_landing",
            Classification::StaticServed(Bundle::React) => "static_react",
            Classification::StaticServed(Bundle::Landing) => "static_landing",
            Classification::Fallback => "fallback",
        }
    }
}

impl From<Destination> for Classification {
    fn from(destination: Destination) -> Self {
        match destination {
            Destination::Api => Classification::Api,
            Destination::Upstream(bundle) => Classification::Proxied(bundle),
            Destination::Static(bundle) => Classification::StaticServed(bundle),
        }
    }
}

/// One row of the route table.
#[derive(Debug, Clone)]
pub struct RouteEntry {
    pub matcher: PathPrefixMatcher,
    pub destination: Destination,
}

impl RouteEntry {
    pub fn new(prefix: impl Into<String>, destination: Destination) -> Self {
        Self {
            matcher: PathPrefixMatcher::new(prefix),
            destination,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouteTableError {
    #[error("route table is empty")]
    Empty,
    #[error("residual '/' entry at position {position} shadows {shadowed} later entries")]
    ResidualNotLast { position: usize, shadowed: usize },
    #[error("prefix {0:?} registered twice")]
    DuplicatePrefix(String),
    #[error("first entry must be the API prefix")]
    ApiNotFirst,
}

/// Ordered table of (prefix, destination) pairs.
#[derive(Debug, Clone)]
pub struct RouteTable {
    entries: Vec<RouteEntry>,
}

impl RouteTable {
    /// Build a table from explicit entries, checking the ordering contract.
    pub fn new(entries: Vec<RouteEntry>) -> Result<Self, RouteTableError> {
        if entries.is_empty() {
            return Err(RouteTableError::Empty);
        }
        if entries[0].destination != Destination::Api {
            return Err(RouteTableError::ApiNotFirst);
        }
        for (i, entry) in entries.iter().enumerate() {
            if entry.matcher.is_residual() && i + 1 != entries.len() {
                return Err(RouteTableError::ResidualNotLast {
                    position: i,
                    shadowed: entries.len() - i - 1,
                });
            }
            if entries[..i].iter().any(|e| e.matcher == entry.matcher) {
                return Err(RouteTableError::DuplicatePrefix(entry.matcher.prefix().to_string()));
            }
        }
        Ok(Self { entries })
    }

    /// The table for `config.mode`: API first, then the mode's specific
    /// prefix, then the residual root.
    pub fn for_config(config: &EdgeConfig) -> Result<Self, RouteTableError> {
        let mut entries = vec![RouteEntry::new(config.api.prefix.clone(), Destination::Api)];
        match config.mode {
            RoutingMode::Development => {
                entries.push(RouteEntry::new(
                    config.upstreams.react.path_prefix.clone(),
                    Destination::Upstream(Bundle::React),
                ));
                entries.push(RouteEntry::new(
                    config.upstreams.landing.path_prefix.clone(),
                    Destination::Upstream(Bundle::Landing),
                ));
            }
            RoutingMode::Production => {
                entries.push(RouteEntry::new(
                    config.assets.react.mount_prefix.clone(),
                    Destination::Static(Bundle::React),
                ));
                entries.push(RouteEntry::new(
                    config.assets.landing.mount_prefix.clone(),
                    Destination::Static(Bundle::Landing),
                ));
            }
        }
        Self::new(entries)
    }

    pub fn entries(&self) -> &[RouteEntry] {
        &self.entries
    }

    /// Classify a request path. First matching entry wins.
    pub fn classify(&self, path: &str) -> Classification {
        self.entries
            .iter()
            .find(|entry| entry.matcher.matches_path(path))
            .map(|entry| entry.destination.into())
            .unwrap_or(Classification::Fallback)
    }
}
