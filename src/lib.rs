//! Maya agent library.
//!
//! The lifecycle controller in [`lifecycle`] owns the agent's run state:
//! readiness, signal-driven shutdown with a bounded graceful leave, and
//! configuration reload on SIGHUP.

pub mod agent;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod ui;

pub use agent::{Agent, AgentError, LocalAgent};
pub use config::{AgentConfig, CliConfigSource, ConfigSource};
pub use lifecycle::{Controller, LifecycleOutcome, SignalEvent, SignalListener};
pub use observability::LogLevelFilter;
