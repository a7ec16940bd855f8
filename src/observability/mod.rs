//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → tracing events
//!     → logging.rs subscriber
//!         ├─ LogLevelFilter gate → gate.rs (held until startup ends) → stdout
//!         ├─ buffer.rs (last 512 lines, unfiltered)
//!         └─ LogLevelFilter gate → syslog, when enabled
//!
//! SIGHUP reload:
//!     → lifecycle::reload validates the new level
//!     → LogLevelFilter::set_min_level (atomic store)
//! ```

pub mod buffer;
pub mod gate;
pub mod logging;

pub use buffer::{LogBuffer, LOG_BUFFER_LINES};
pub use gate::LogGate;
pub use logging::{validate_level, LogLevelFilter, LogOutputs, LoggingError};
