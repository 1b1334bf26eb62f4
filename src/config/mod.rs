//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! defaults
//!     → loader.rs (optional TOML file)
//!     → loader.rs (environment, then command-line overrides)
//!     → validation.rs (semantic checks)
//!     → EdgeConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; there is no hot reload, so the routing
//!   mode can never change under a running process
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod mode;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError, LoadOptions};
pub use mode::RoutingMode;
pub use schema::{
    ApiConfig, AssetsConfig, DatabaseConfig, EdgeConfig, ListenerConfig, LogFormat,
    ObservabilityConfig, RateLimitConfig, SecurityConfig, StaticTreeConfig, TimeoutConfig,
    UpstreamConfig, UpstreamsConfig, WindowConfig,
};
