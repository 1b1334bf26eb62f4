//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (request ID, client address)
//!     → security gate → route table → terminal handler
//!     → response.rs (error responses for every failure class)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{ClientAddress, MakeRequestUuid, X_REQUEST_ID};
pub use response::EdgeRejection;
pub use server::{AppState, EdgeServer, ServerError};
