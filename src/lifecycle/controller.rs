//! Dispatch loop driving the agent from readiness to exit.
//!
//! # States
//! ```text
//! Waiting ──event──→ Dispatching ──reload──→ Waiting
//!                          │
//!                          ├── terminating, not graceful ──→ Terminated
//!                          └── terminating, graceful ──→ Leaving ──→ Terminated
//! ```
//!
//! Events are handled one at a time: a reload finishes before the next
//! event is read, and the loop is left exactly once. The current state is
//! published on a `watch` channel ([`Controller::subscribe`]).

use std::sync::Arc;

use arc_swap::ArcSwap;
use tokio::sync::watch;

use crate::agent::Agent;
use crate::config::{AgentConfig, ConfigSource};
use crate::lifecycle::reload::handle_reload;
use crate::lifecycle::shutdown::{handle_shutdown, is_graceful, LifecycleOutcome};
use crate::lifecycle::signals::{SignalEvent, SignalListener};
use crate::observability::LogLevelFilter;
use crate::ui::Ui;

/// Phase of the dispatch loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Waiting,
    Dispatching,
    Leaving,
    Terminated,
}

/// Owns the run state of the agent.
pub struct Controller<A: Agent> {
    agent: Arc<A>,
    source: Arc<dyn ConfigSource>,
    config: Arc<ArcSwap<AgentConfig>>,
    filter: Arc<LogLevelFilter>,
    listener: SignalListener,
    ui: Arc<dyn Ui>,
    state: watch::Sender<LifecycleState>,
}

impl<A: Agent> Controller<A> {
    pub fn new(
        agent: Arc<A>,
        source: Arc<dyn ConfigSource>,
        config: Arc<ArcSwap<AgentConfig>>,
        filter: Arc<LogLevelFilter>,
        listener: SignalListener,
        ui: Arc<dyn Ui>,
    ) -> Self {
        Self {
            agent,
            source,
            config,
            filter,
            listener,
            ui,
            state: watch::Sender::new(LifecycleState::Waiting),
        }
    }

    /// Follow the loop's state. The receiver outlives the controller and
    /// ends on `Terminated`.
    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.state.subscribe()
    }

    /// Wait for signals until one ends the lifecycle.
    pub async fn run(mut self) -> LifecycleOutcome {
        loop {
            self.transition(LifecycleState::Waiting);
            let event = match self.listener.recv().await {
                Some(event) => event,
                None => {
                    tracing::warn!("All signal sources closed, treating as shutdown");
                    SignalEvent::ExternalShutdown
                }
            };

            self.transition(LifecycleState::Dispatching);
            self.ui.output(&format!("Caught signal: {event}"));

            if !event.is_terminating() {
                if event == SignalEvent::Reload {
                    self.reload();
                }
                continue;
            }

            let graceful = is_graceful(event, &self.config.load());
            if graceful {
                self.transition(LifecycleState::Leaving);
            }
            let outcome =
                handle_shutdown(event, graceful, &self.agent, &mut self.listener, &self.ui).await;

            self.transition(LifecycleState::Terminated);
            tracing::info!(outcome = ?outcome, exit_code = outcome.exit_code(), "Lifecycle finished");
            return outcome;
        }
    }

    fn reload(&mut self) {
        let current = self.config.load_full();
        if let Some(next) = handle_reload(&current, self.source.as_ref(), &self.filter, self.ui.as_ref()) {
            self.config.store(Arc::new(next));
        }
    }

    fn transition(&mut self, next: LifecycleState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            tracing::trace!(from = ?previous, to = ?next, "Lifecycle state change");
        }
    }
}
