//! HTTP API subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum router, trace layer)
//!     → handlers read the shared ArcSwap<AgentConfig> and agent state
//!     → JSON response
//! ```

pub mod server;

pub use server::{AppState, HttpHandle, HttpServer};
