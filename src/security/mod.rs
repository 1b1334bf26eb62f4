//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Every response:
//!     ← headers.rs (strip disclosure headers, add hardening headers)
//!
//! Incoming request:
//!     → gate.rs, in order:
//!         audit.rs       (log security-looking paths)
//!         origin.rs      (allow-list, Production Mode only; CORS)
//!         rate_limit.rs  (global window per client)
//!         rate_limit.rs  (API window per client, API prefix only)
//!     → Pass to routing
//! ```
//!
//! # Design Decisions
//! - Fail closed: a rejection is a terminal response, later steps never run
//! - The liveness path is exempt from both windows
//! - No trust in client input; forwarded headers only when configured

pub mod audit;
pub mod gate;
pub mod headers;
pub mod origin;
pub mod rate_limit;

pub use gate::{security_gate_middleware, RateLimiters, SecurityGate};
pub use headers::{harden_headers_middleware, HardeningHeaders};
