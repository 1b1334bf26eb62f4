//! Development proxy.
//!
//! # Data Flow
//! ```text
//! dispatch (Proxied(bundle))
//!     → upstream.rs (rewrite URI, forward headers, send)
//!         → 101? upgrade.rs (byte tunnel until either side closes)
//!         → else stream the upstream response back
//! ```
//!
//! Only constructed in Development Mode.

pub mod upgrade;
pub mod upstream;

pub use upstream::{DevProxy, ProxyError, UpstreamTarget};
