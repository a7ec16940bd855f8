//! Shared fixtures for the lifecycle integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use arc_swap::ArcSwap;
use tokio::sync::mpsc;

use maya_agent::agent::{Agent, AgentError, AgentState};
use maya_agent::config::{AgentConfig, ConfigError, ConfigSource};
use maya_agent::lifecycle::{Controller, SignalEvent, SignalListener};
use maya_agent::observability::LogLevelFilter;
use maya_agent::ui::Ui;

/// How the fake agent's leave behaves.
#[derive(Debug, Clone, Copy)]
pub enum Leave {
    Succeed,
    SucceedAfter(Duration),
    Hang,
    Fail,
}

/// Agent that records calls and leaves as scripted.
pub struct FakeAgent {
    behavior: Leave,
    pub leave_calls: AtomicUsize,
    pub shutdown_calls: AtomicUsize,
}

impl FakeAgent {
    pub fn new(behavior: Leave) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            leave_calls: AtomicUsize::new(0),
            shutdown_calls: AtomicUsize::new(0),
        })
    }

    pub fn leaves(&self) -> usize {
        self.leave_calls.load(Ordering::SeqCst)
    }

    pub fn shutdowns(&self) -> usize {
        self.shutdown_calls.load(Ordering::SeqCst)
    }
}

impl Agent for FakeAgent {
    async fn leave(&self) -> Result<(), AgentError> {
        self.leave_calls.fetch_add(1, Ordering::SeqCst);
        match self.behavior {
            Leave::Succeed => Ok(()),
            Leave::SucceedAfter(delay) => {
                tokio::time::sleep(delay).await;
                Ok(())
            }
            Leave::Hang => std::future::pending().await,
            Leave::Fail => Err(AgentError::NotAlive(AgentState::Left)),
        }
    }

    async fn shutdown(&self) {
        self.shutdown_calls.fetch_add(1, Ordering::SeqCst);
    }
}

/// Ui that keeps every line.
#[derive(Default)]
pub struct RecordingUi {
    lines: Mutex<Vec<String>>,
}

impl RecordingUi {
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines().iter().any(|l| l.contains(needle))
    }

    fn push(&self, message: &str) {
        self.lines.lock().unwrap().push(message.to_string());
    }
}

impl Ui for RecordingUi {
    fn output(&self, message: &str) {
        self.push(message);
    }
    fn info(&self, message: &str) {
        self.push(message);
    }
    fn warn(&self, message: &str) {
        self.push(message);
    }
    fn error(&self, message: &str) {
        self.push(message);
    }
}

/// Config source returning queued results in order.
#[derive(Default)]
pub struct ScriptedSource {
    results: Mutex<VecDeque<Result<AgentConfig, ConfigError>>>,
}

impl ScriptedSource {
    pub fn push(&self, result: Result<AgentConfig, ConfigError>) {
        self.results.lock().unwrap().push_back(result);
    }
}

impl ConfigSource for ScriptedSource {
    fn acquire(&self, _ui: &dyn Ui) -> Result<AgentConfig, ConfigError> {
        self.results
            .lock()
            .unwrap()
            .pop_front()
            .expect("unexpected config acquisition")
    }
}

/// A controller wired to fakes, plus the handles tests drive it with.
pub struct Harness {
    pub agent: Arc<FakeAgent>,
    pub source: Arc<ScriptedSource>,
    pub config: Arc<ArcSwap<AgentConfig>>,
    pub filter: Arc<LogLevelFilter>,
    pub ui: Arc<RecordingUi>,
    pub events: mpsc::Sender<SignalEvent>,
    pub shutdown: mpsc::Sender<()>,
    pub controller: Controller<FakeAgent>,
}

pub fn harness(config: AgentConfig, behavior: Leave) -> Harness {
    let agent = FakeAgent::new(behavior);
    let source = Arc::new(ScriptedSource::default());
    let shared = Arc::new(ArcSwap::from_pointee(config));
    let filter = Arc::new(LogLevelFilter::new());
    let ui = Arc::new(RecordingUi::default());
    let (events, events_rx) = mpsc::channel(16);
    let (shutdown, shutdown_rx) = mpsc::channel(4);

    let controller = Controller::new(
        Arc::clone(&agent),
        source.clone(),
        Arc::clone(&shared),
        Arc::clone(&filter),
        SignalListener::new(events_rx, Some(shutdown_rx)),
        ui.clone(),
    );

    Harness {
        agent,
        source,
        config: shared,
        filter,
        ui,
        events,
        shutdown,
        controller,
    }
}

pub fn leave_on_interrupt() -> AgentConfig {
    AgentConfig {
        leave_on_interrupt: true,
        ..Default::default()
    }
}
