//! Configuration reload on SIGHUP.
//!
//! # Algorithm
//! ```text
//! acquire new snapshot ── error ──→ report, keep current snapshot
//!        │
//!   normalize requested log level
//!        │
//!   valid?  ── yes → set filter min level, adopt snapshot
//!           ── no  → report, copy current log_level into the snapshot,
//!                    adopt snapshot
//! ```
//!
//! An invalid log level only rolls back the log level. Every other field of
//! the reloaded snapshot still takes effect.

use crate::config::{AgentConfig, ConfigSource};
use crate::observability::logging::{normalize_level, LogLevelFilter};
use crate::ui::Ui;

/// Build the replacement for `current`, or `None` to keep `current`.
pub fn handle_reload(
    current: &AgentConfig,
    source: &dyn ConfigSource,
    filter: &LogLevelFilter,
    ui: &dyn Ui,
) -> Option<AgentConfig> {
    ui.output("Reloading agent configuration...");

    let mut candidate = match source.acquire(ui) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Config reload failed, keeping current configuration");
            ui.error(&e.to_string());
            ui.error("Failed to reload config");
            return None;
        }
    };

    let requested = normalize_level(&candidate.log_level);
    match filter.find(&requested) {
        Some(level) => {
            filter.set_min_level(level);
            tracing::info!(log_level = %level, "Log level updated");
        }
        None => {
            ui.error(&format!(
                "Invalid log level: {}. Valid log levels are: {}",
                requested,
                filter.valid_names()
            ));
            candidate.log_level = current.log_level.clone();
        }
    }

    Some(candidate)
}
