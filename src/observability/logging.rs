//! Structured logging.
//!
//! # Responsibilities
//! - Hold the shared minimum log level ([`LogLevelFilter`])
//! - Validate requested levels against the known set
//! - Install the `tracing` subscriber that consults the filter
//! - Route events to the gated console, the recent-lines buffer and,
//!   when enabled, syslog
//!
//! # Design Decisions
//! - The minimum level lives in an atomic cell: reload is the single
//!   writer, every log event is a reader
//! - The subscriber filter reads the cell per event, so a reload applies
//!   without rebuilding the subscriber
//! - Console and syslog share the level gate; the buffer keeps everything

use std::fmt;
use std::io;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tracing::{Level, Metadata};
use tracing_subscriber::filter::{filter_fn, EnvFilter, FilterFn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use crate::config::AgentConfig;
use crate::observability::buffer::LogBuffer;
use crate::observability::gate::LogGate;

/// Levels the agent accepts, most verbose first.
pub const VALID_LEVELS: [Level; 5] = [
    Level::TRACE,
    Level::DEBUG,
    Level::INFO,
    Level::WARN,
    Level::ERROR,
];

/// Normalize an operator supplied level name for validation.
pub fn normalize_level(requested: &str) -> String {
    requested.trim().to_uppercase()
}

/// Shared minimum-severity gate for the logging pipeline.
#[derive(Debug)]
pub struct LogLevelFilter {
    levels: Vec<Level>,
    /// Index into `levels`.
    min: AtomicUsize,
}

impl LogLevelFilter {
    /// Filter over [`VALID_LEVELS`] starting at `INFO`.
    pub fn new() -> Self {
        Self::build(VALID_LEVELS.to_vec(), Level::INFO)
    }

    /// `levels` must be ordered most verbose first. A `min_level` outside
    /// `levels` falls back to the first entry. `None` for an empty set.
    pub fn with_levels(levels: Vec<Level>, min_level: Level) -> Option<Self> {
        if levels.is_empty() {
            return None;
        }
        Some(Self::build(levels, min_level))
    }

    fn build(levels: Vec<Level>, min_level: Level) -> Self {
        let min = levels.iter().position(|l| *l == min_level).unwrap_or(0);
        Self {
            levels,
            min: AtomicUsize::new(min),
        }
    }

    pub fn min_level(&self) -> Level {
        self.levels[self.min.load(Ordering::Acquire)]
    }

    /// Look up a normalized level name in the valid set.
    pub fn find(&self, name: &str) -> Option<Level> {
        self.levels.iter().copied().find(|l| l.as_str() == name)
    }

    /// Set the minimum level. Returns false, leaving the filter untouched,
    /// when `level` is not one of the valid levels.
    pub fn set_min_level(&self, level: Level) -> bool {
        match self.levels.iter().position(|l| *l == level) {
            Some(idx) => {
                self.min.store(idx, Ordering::Release);
                true
            }
            None => false,
        }
    }

    /// Whether an event at `level` passes the gate. Levels outside the
    /// valid set are dropped.
    pub fn enabled(&self, level: &Level) -> bool {
        match self.levels.iter().position(|l| l == level) {
            Some(idx) => idx >= self.min.load(Ordering::Acquire),
            None => false,
        }
    }

    /// Display helper listing the valid level names.
    pub fn valid_names(&self) -> LevelNames<'_> {
        LevelNames(&self.levels)
    }
}

impl Default for LogLevelFilter {
    fn default() -> Self {
        Self::new()
    }
}

/// Formats as `[TRACE DEBUG INFO WARN ERROR]`.
pub struct LevelNames<'a>(&'a [Level]);

impl fmt::Display for LevelNames<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, level) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}", level.as_str())?;
        }
        write!(f, "]")
    }
}

/// Check a normalized level name against the filter's known set.
pub fn validate_level(level: &str, filter: &LogLevelFilter) -> bool {
    filter.find(level).is_some()
}

/// Errors raised while wiring log outputs.
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Invalid syslog facility: {0}")]
    UnknownFacility(String),

    #[error("Syslog setup failed: {0}")]
    Syslog(String),
}

/// Syslog facilities the agent can log under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyslogFacility {
    User,
    Mail,
    Daemon,
    Auth,
    Lpr,
    News,
    Uucp,
    Cron,
    Local0,
    Local1,
    Local2,
    Local3,
    Local4,
    Local5,
    Local6,
    Local7,
}

impl FromStr for SyslogFacility {
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let facility = match s.trim().to_uppercase().as_str() {
            "USER" => SyslogFacility::User,
            "MAIL" => SyslogFacility::Mail,
            "DAEMON" => SyslogFacility::Daemon,
            "AUTH" => SyslogFacility::Auth,
            "LPR" => SyslogFacility::Lpr,
            "NEWS" => SyslogFacility::News,
            "UUCP" => SyslogFacility::Uucp,
            "CRON" => SyslogFacility::Cron,
            "LOCAL0" => SyslogFacility::Local0,
            "LOCAL1" => SyslogFacility::Local1,
            "LOCAL2" => SyslogFacility::Local2,
            "LOCAL3" => SyslogFacility::Local3,
            "LOCAL4" => SyslogFacility::Local4,
            "LOCAL5" => SyslogFacility::Local5,
            "LOCAL6" => SyslogFacility::Local6,
            "LOCAL7" => SyslogFacility::Local7,
            _ => return Err(LoggingError::UnknownFacility(s.to_string())),
        };
        Ok(facility)
    }
}

/// Handles to the outputs of the installed subscriber.
pub struct LogOutputs {
    /// Console output, held back until [`LogGate::flush`].
    pub gate: LogGate<io::Stdout>,
    /// Recent formatted lines.
    pub buffer: LogBuffer,
}

fn level_gate(filter: Arc<LogLevelFilter>) -> FilterFn<impl Fn(&Metadata<'_>) -> bool> {
    filter_fn(move |meta: &Metadata<'_>| filter.enabled(meta.level()))
}

/// Install the global subscriber. Per-target directives from `RUST_LOG`
/// still apply; the shared filter gates console and syslog by severity.
///
/// Fails only when syslog is enabled and cannot be set up. If a subscriber
/// is already installed the returned outputs are not attached to it.
pub fn init(filter: Arc<LogLevelFilter>, config: &AgentConfig) -> Result<LogOutputs, LoggingError> {
    let syslog = if config.enable_syslog {
        let facility: SyslogFacility = config.syslog_facility.parse()?;
        Some(syslog::writer(facility)?)
    } else {
        None
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "maya_agent=trace,tower_http=debug,info".into());

    let gate = LogGate::new(io::stdout());
    let buffer = LogBuffer::default();

    let console = tracing_subscriber::fmt::layer()
        .with_writer(gate.clone())
        .with_filter(level_gate(Arc::clone(&filter)));
    let recent = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(buffer.clone());
    let syslog = syslog.map(|writer| {
        tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .without_time()
            .with_writer(writer)
            .with_filter(level_gate(filter))
    });

    if tracing_subscriber::registry()
        .with(env_filter)
        .with(console)
        .with(recent)
        .with(syslog)
        .try_init()
        .is_err()
    {
        tracing::debug!("Global subscriber already installed");
    }

    Ok(LogOutputs { gate, buffer })
}

#[cfg(unix)]
mod syslog {
    use syslog_tracing::{Facility, Options, Syslog};

    use super::{LoggingError, SyslogFacility};

    pub(super) fn writer(facility: SyslogFacility) -> Result<Syslog, LoggingError> {
        let facility = match facility {
            SyslogFacility::User => Facility::User,
            SyslogFacility::Mail => Facility::Mail,
            SyslogFacility::Daemon => Facility::Daemon,
            SyslogFacility::Auth => Facility::Auth,
            SyslogFacility::Lpr => Facility::Lpr,
            SyslogFacility::News => Facility::News,
            SyslogFacility::Uucp => Facility::Uucp,
            SyslogFacility::Cron => Facility::Cron,
            SyslogFacility::Local0 => Facility::Local0,
            SyslogFacility::Local1 => Facility::Local1,
            SyslogFacility::Local2 => Facility::Local2,
            SyslogFacility::Local3 => Facility::Local3,
            SyslogFacility::Local4 => Facility::Local4,
            SyslogFacility::Local5 => Facility::Local5,
            SyslogFacility::Local6 => Facility::Local6,
            SyslogFacility::Local7 => Facility::Local7,
        };
        // Only one syslog connection per process.
        Syslog::new(c"maya-agent", Options::LOG_PID, facility)
            .ok_or_else(|| LoggingError::Syslog("syslog is already initialized".to_string()))
    }
}

#[cfg(not(unix))]
mod syslog {
    use super::{LoggingError, SyslogFacility};

    pub(super) fn writer(_facility: SyslogFacility) -> Result<fn() -> std::io::Sink, LoggingError> {
        Err(LoggingError::Syslog(
            "syslog is not supported on this platform".to_string(),
        ))
    }
}
