//! Routing mode selection.
//!
//! The mode is resolved once while the configuration is loaded and then
//! travels inside the immutable `EdgeConfig`. Nothing reads it from the
//! environment after startup.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which subsystem answers non-API traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RoutingMode {
    /// Forward to the React and landing dev servers.
    #[default]
    Development,
    /// Serve the built bundles from disk.
    Production,
}

impl RoutingMode {
    /// Derive the mode from a `NODE_ENV`-style value.
    ///
    /// Only the literal `production` selects Production Mode; anything else,
    /// including an absent value, selects Development Mode.
    pub fn from_env_value(value: Option<&str>) -> Self {
        match value {
            Some("production") => RoutingMode::Production,
            _ => RoutingMode::Development,
        }
    }

    pub fn is_production(self) -> bool {
        self == RoutingMode::Production
    }

    /// Name of the environment variable holding the database URL in this mode.
    pub fn database_url_var(self) -> &'static str {
        match self {
            RoutingMode::Production => "DATABASE_URL",
            RoutingMode::Development => "DEV_DATABASE_URL",
        }
    }
}

impl fmt::Display for RoutingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoutingMode::Development => write!(f, "development"),
            RoutingMode::Production => write!(f, "production"),
        }
    }
}
