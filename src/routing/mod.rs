//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (path)
//!     → router.rs (ordered table scan)
//!     → matcher.rs (segment-aware prefix test)
//!     → Return: Classification (Api | Proxied | StaticServed | Fallback)
//!
//! Table Compilation (at startup):
//!     EdgeConfig + RoutingMode
//!     → API entry
//!     → mode-specific React entry
//!     → residual `/` entry (must be last)
//!     → Freeze as immutable RouteTable
//! ```
//!
//! # Design Decisions
//! - Table compiled at startup, immutable at runtime
//! - No regex in hot path (prefix matching only)
//! - Deterministic: same input always matches same route
//! - First match wins

pub mod matcher;
pub mod router;

pub use matcher::PathPrefixMatcher;
pub use router::{Bundle, Classification, Destination, RouteEntry, RouteTable, RouteTableError};
