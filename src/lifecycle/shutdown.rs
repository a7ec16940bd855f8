//! Shutdown decision for terminating signals.
//!
//! # Algorithm
//! ```text
//! Interrupt / external shutdown → eligible iff leave_on_interrupt
//! Terminate                     → eligible iff leave_on_terminate
//!
//! not eligible → exit 1
//! eligible     → spawn Agent::leave, then first of:
//!                  another signal        → exit 1
//!                  GRACEFUL_TIMEOUT      → exit 1
//!                  leave completed       → exit 0
//! ```
//!
//! The leave task is never cancelled. When the race resolves some other
//! way its completion is sent into a dropped channel and discarded.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;

use crate::agent::Agent;
use crate::config::AgentConfig;
use crate::lifecycle::signals::{SignalEvent, SignalListener};
use crate::ui::Ui;

/// How long a graceful leave may take before the process exits anyway.
pub const GRACEFUL_TIMEOUT: Duration = Duration::from_secs(5);

/// Terminal result of the lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleOutcome {
    /// The agent left the cluster gracefully.
    Clean,
    /// Graceful leave not configured for this signal.
    NotGraceful,
    /// Another signal arrived while leaving.
    Forced,
    /// The leave did not finish within [`GRACEFUL_TIMEOUT`].
    TimedOut,
}

impl LifecycleOutcome {
    /// Process exit code.
    pub fn exit_code(self) -> u8 {
        match self {
            LifecycleOutcome::Clean => 0,
            _ => 1,
        }
    }
}

/// Whether `event` should trigger a graceful leave under `config`.
pub fn is_graceful(event: SignalEvent, config: &AgentConfig) -> bool {
    match event {
        SignalEvent::Interrupt | SignalEvent::ExternalShutdown => config.leave_on_interrupt,
        SignalEvent::Terminate => config.leave_on_terminate,
        SignalEvent::Reload | SignalEvent::Ignorable => false,
    }
}

/// Decide how the process ends after the terminating `event`. `graceful`
/// is [`is_graceful`] for the event under the active config.
pub async fn handle_shutdown<A: Agent>(
    event: SignalEvent,
    graceful: bool,
    agent: &Arc<A>,
    listener: &mut SignalListener,
    ui: &Arc<dyn Ui>,
) -> LifecycleOutcome {
    if !graceful {
        tracing::info!(signal = %event, "Graceful leave not enabled, exiting");
        return LifecycleOutcome::NotGraceful;
    }

    ui.output("Gracefully shutting down agent...");
    let left = spawn_leave(Arc::clone(agent), Arc::clone(ui));

    tokio::select! {
        second = second_signal(listener) => {
            tracing::warn!(signal = %second, "Second signal during graceful leave, forcing exit");
            LifecycleOutcome::Forced
        }
        _ = tokio::time::sleep(GRACEFUL_TIMEOUT) => {
            tracing::warn!(timeout = ?GRACEFUL_TIMEOUT, "Graceful leave timed out");
            LifecycleOutcome::TimedOut
        }
        _ = leave_completed(left) => {
            tracing::info!("Graceful leave complete");
            LifecycleOutcome::Clean
        }
    }
}

fn spawn_leave<A: Agent>(agent: Arc<A>, ui: Arc<dyn Ui>) -> oneshot::Receiver<()> {
    let (done_tx, done_rx) = oneshot::channel();
    tokio::spawn(async move {
        match agent.leave().await {
            Ok(()) => {
                // The race may already be over; nobody listening is fine.
                let _ = done_tx.send(());
            }
            Err(e) => {
                tracing::error!(error = %e, "Graceful leave failed");
                ui.error(&format!("Error: {e}"));
            }
        }
    });
    done_rx
}

/// Resolves only if the leave succeeded. A failed leave leaves the timer
/// to decide.
async fn leave_completed(done: oneshot::Receiver<()>) {
    if done.await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// Resolves on the next dispatchable event. A listener with every source
/// closed never resolves.
async fn second_signal(listener: &mut SignalListener) -> SignalEvent {
    match listener.recv().await {
        Some(event) => event,
        None => std::future::pending().await,
    }
}
