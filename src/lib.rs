//! Unified edge router library.
//!
//! One listener fronts an API, a React single-page application and a
//! landing site. In Development Mode the two front-ends are proxied to their
//! dev servers; in Production Mode they are served from built bundles.

pub mod api;
pub mod assets;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod proxy;
pub mod routing;
pub mod security;

pub use config::{EdgeConfig, RoutingMode};
pub use http::EdgeServer;
pub use lifecycle::Shutdown;
