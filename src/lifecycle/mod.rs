//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Acquire config → Log filter → Logging (held) → Agent → HTTP
//!         → Banner → release held logs → Controller
//!
//! Controller (controller.rs):
//!     signals.rs event
//!         SIGHUP          → reload.rs → back to waiting
//!         SIGINT/SIGTERM  → shutdown.rs → exit code
//!         SIGPIPE         → swallowed by signals.rs
//!
//! Teardown (startup.rs):
//!     HTTP shutdown → Agent shutdown, on every path
//! ```
//!
//! # Design Decisions
//! - One dispatch loop; events never interleave
//! - Graceful leave is bounded by a fixed timeout
//! - A second signal during leave forces exit

pub mod controller;
pub mod reload;
pub mod shutdown;
pub mod signals;
pub mod startup;

pub use controller::{Controller, LifecycleState};
pub use shutdown::{LifecycleOutcome, GRACEFUL_TIMEOUT};
pub use signals::{SignalEvent, SignalListener};
