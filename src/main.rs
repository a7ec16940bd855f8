//! Maya agent.
//!
//! # Architecture Overview
//!
//! ```text
//!   args ──▶ config ──▶ observability ──▶ agent ──▶ http
//!                                                     │
//!                                                     ▼
//!   SIGINT/SIGTERM/SIGHUP/SIGPIPE ──▶ lifecycle::Controller ──▶ exit code
//!                                        │        │
//!                                 reload │        │ graceful leave
//!                                        ▼        ▼
//!                                   config +   Agent::leave
//!                                   LogLevelFilter   (5s bound)
//! ```

use std::process::ExitCode;
use std::sync::Arc;

use tokio::sync::mpsc;

use maya_agent::config::{BuildInfo, CliConfigSource};
use maya_agent::lifecycle::startup;
use maya_agent::ui::ConsoleUi;

#[tokio::main]
async fn main() -> ExitCode {
    let source = Arc::new(CliConfigSource::new(std::env::args_os(), BuildInfo::current()));

    // Nothing in-process asks for shutdown; the sender is held so the
    // channel stays open for the life of the agent.
    let (_shutdown_tx, shutdown_rx) = mpsc::channel(1);

    let code = startup::run(source, Arc::new(ConsoleUi::new()), Some(shutdown_rx)).await;
    ExitCode::from(code)
}
