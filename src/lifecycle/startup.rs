//! Startup orchestration.
//!
//! # Responsibilities
//! - Acquire configuration and validate the log level
//! - Install logging, with console output held back until the banner
//! - Start the agent, then the HTTP server
//! - Print the configuration banner and hand over to the controller
//! - Tear the HTTP server and the agent down on every exit path
//!
//! # Design Decisions
//! - Fail fast: any startup error exits with code 1 before signals are read
//! - The HTTP server starts last and stops first
//! - Held log lines are released once the banner is out, or on a failed
//!   start so the cause is visible

use std::sync::Arc;

use arc_swap::ArcSwap;
use clap::error::ErrorKind;
use tokio::sync::mpsc;

use crate::agent::{Agent, AgentError, LocalAgent};
use crate::config::{AgentConfig, ConfigError, ConfigSource};
use crate::http::{AppState, HttpServer};
use crate::lifecycle::controller::Controller;
use crate::lifecycle::signals::SignalListener;
use crate::observability::logging::{self, normalize_level, LogLevelFilter, LogOutputs};
use crate::ui::Ui;

/// Padding the banner keys are right-aligned to.
const BANNER_PADDING: usize = 18;

/// Run the agent until a signal ends it. Returns the process exit code.
pub async fn run(
    source: Arc<dyn ConfigSource>,
    ui: Arc<dyn Ui>,
    shutdown: Option<mpsc::Receiver<()>>,
) -> u8 {
    run_with(source, ui, shutdown, |config| {
        LocalAgent::start(config).map(Arc::new)
    })
    .await
}

/// [`run`] with the agent brought up by `start_agent`.
pub async fn run_with<F>(
    source: Arc<dyn ConfigSource>,
    ui: Arc<dyn Ui>,
    shutdown: Option<mpsc::Receiver<()>>,
    start_agent: F,
) -> u8
where
    F: FnOnce(&AgentConfig) -> Result<Arc<LocalAgent>, AgentError>,
{
    let config = match source.acquire(ui.as_ref()) {
        Ok(config) => config,
        Err(ConfigError::Flags(e)) => return report_flags_error(&e, ui.as_ref()),
        Err(e) => {
            ui.error(&e.to_string());
            return 1;
        }
    };

    let Some(filter) = build_filter(&config, ui.as_ref()) else {
        return 1;
    };
    let filter = Arc::new(filter);
    let outputs = match logging::init(Arc::clone(&filter), &config) {
        Ok(outputs) => outputs,
        Err(e) => {
            ui.error(&e.to_string());
            return 1;
        }
    };

    if config.files.is_empty() {
        ui.info("No configuration files loaded");
    } else {
        ui.info(&format!(
            "Loaded configuration from {}",
            config.files.join(", ")
        ));
    }

    ui.output("Starting Maya agent...");
    let agent = match start_agent(&config) {
        Ok(agent) => agent,
        Err(e) => {
            ui.error(&format!("Error starting agent: {e}"));
            release_logs(&outputs, ui.as_ref());
            return 1;
        }
    };

    let Some(addrs) = config.normalized else {
        ui.error("Error starting http server: addresses were not normalized");
        agent.shutdown().await;
        release_logs(&outputs, ui.as_ref());
        return 1;
    };

    let shared = Arc::new(ArcSwap::from_pointee(config));
    let server = HttpServer::new(AppState {
        config: Arc::clone(&shared),
        agent: Arc::clone(&agent),
        logs: outputs.buffer.clone(),
    });
    let http = match server.start(addrs.http).await {
        Ok(http) => http,
        Err(e) => {
            ui.error(&format!("Error starting http server: {e}"));
            agent.shutdown().await;
            release_logs(&outputs, ui.as_ref());
            return 1;
        }
    };

    let code = match SignalListener::from_os(shutdown) {
        Ok(listener) => {
            print_banner(&shared.load(), ui.as_ref());
            ui.output("Maya agent started! Log data will stream in below:\n");
            release_logs(&outputs, ui.as_ref());

            let controller = Controller::new(
                Arc::clone(&agent),
                source,
                shared,
                filter,
                listener,
                Arc::clone(&ui),
            );
            controller.run().await.exit_code()
        }
        Err(e) => {
            ui.error(&format!("Error registering signal handlers: {e}"));
            release_logs(&outputs, ui.as_ref());
            1
        }
    };

    http.shutdown().await;
    agent.shutdown().await;
    code
}

fn release_logs(outputs: &LogOutputs, ui: &dyn Ui) {
    if let Err(e) = outputs.gate.flush() {
        ui.warn(&format!("Failed to write held log output: {e}"));
    }
}

/// Filter at the config's log level, or `None` after reporting an invalid
/// level.
pub fn build_filter(config: &AgentConfig, ui: &dyn Ui) -> Option<LogLevelFilter> {
    let filter = LogLevelFilter::new();
    let requested = normalize_level(&config.log_level);
    if !logging::validate_level(&requested, &filter) {
        ui.error(&format!(
            "Invalid log level: {}. Valid log levels are: {}",
            requested,
            filter.valid_names()
        ));
        return None;
    }
    filter.set_min_level(filter.find(&requested)?);
    Some(filter)
}

/// Sorted `Key: value` lines describing the running agent.
pub fn banner_lines(config: &AgentConfig) -> Vec<String> {
    let mut info = vec![
        ("log level", config.log_level.clone()),
        (
            "region",
            format!("{} (DC: {})", config.region, config.datacenter),
        ),
        ("version", config.full_version()),
    ];
    info.sort_by_key(|(key, _)| *key);

    info.into_iter()
        .map(|(key, value)| {
            format!(
                "{}{}: {}",
                " ".repeat(BANNER_PADDING.saturating_sub(key.len())),
                title_case(key),
                value
            )
        })
        .collect()
}

fn print_banner(config: &AgentConfig, ui: &dyn Ui) {
    ui.output("Maya agent configuration:\n");
    for line in banner_lines(config) {
        ui.info(&line);
    }
    ui.output("");
}

fn title_case(key: &str) -> String {
    key.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn report_flags_error(err: &clap::Error, ui: &dyn Ui) -> u8 {
    match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
            ui.output(err.render().to_string().trim_end());
            0
        }
        _ => {
            ui.error(err.render().to_string().trim_end());
            1
        }
    }
}
