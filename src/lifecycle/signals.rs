//! OS signal handling.
//!
//! # Responsibilities
//! - Register SIGINT, SIGTERM, SIGHUP and SIGPIPE
//! - Merge them with the externally owned shutdown channel
//! - Hand the dispatch loop one event at a time
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - SIGPIPE is swallowed here and never reaches the dispatch loop
//! - The external shutdown trigger reads as an interrupt

use std::fmt;

use tokio::sync::mpsc;

/// A normalized lifecycle event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalEvent {
    /// SIGINT.
    Interrupt,
    /// SIGTERM.
    Terminate,
    /// SIGHUP, reload configuration.
    Reload,
    /// SIGPIPE.
    Ignorable,
    /// A message on the external shutdown channel.
    ExternalShutdown,
}

impl SignalEvent {
    /// Whether the event asks the process to stop.
    pub fn is_terminating(self) -> bool {
        matches!(
            self,
            SignalEvent::Interrupt | SignalEvent::Terminate | SignalEvent::ExternalShutdown
        )
    }
}

impl fmt::Display for SignalEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SignalEvent::Interrupt | SignalEvent::ExternalShutdown => "interrupt",
            SignalEvent::Terminate => "terminated",
            SignalEvent::Reload => "hangup",
            SignalEvent::Ignorable => "broken pipe",
        };
        f.write_str(name)
    }
}

/// Merged stream of OS signals and the external shutdown trigger.
pub struct SignalListener {
    events: Option<mpsc::Receiver<SignalEvent>>,
    shutdown: Option<mpsc::Receiver<()>>,
}

impl SignalListener {
    /// Listen to the process's OS signals. Must be called inside a Tokio
    /// runtime; fails if a handler cannot be registered.
    pub fn from_os(shutdown: Option<mpsc::Receiver<()>>) -> std::io::Result<Self> {
        let (tx, rx) = mpsc::channel(4);
        os::forward(tx)?;
        Ok(Self::new(rx, shutdown))
    }

    /// Listen to an arbitrary event source.
    pub fn new(events: mpsc::Receiver<SignalEvent>, shutdown: Option<mpsc::Receiver<()>>) -> Self {
        Self {
            events: Some(events),
            shutdown,
        }
    }

    /// Wait for the next dispatchable event. Ignorable signals are consumed
    /// here. Returns `None` once every source has closed.
    pub async fn recv(&mut self) -> Option<SignalEvent> {
        loop {
            if self.events.is_none() && self.shutdown.is_none() {
                return None;
            }

            let event = tokio::select! {
                event = recv_event(&mut self.events) => match event {
                    Some(event) => event,
                    None => {
                        self.events = None;
                        continue;
                    }
                },
                msg = recv_shutdown(&mut self.shutdown) => match msg {
                    Some(()) => SignalEvent::ExternalShutdown,
                    None => {
                        self.shutdown = None;
                        continue;
                    }
                },
            };

            if event == SignalEvent::Ignorable {
                tracing::debug!("Ignoring broken pipe signal");
                continue;
            }
            return Some(event);
        }
    }
}

async fn recv_event(events: &mut Option<mpsc::Receiver<SignalEvent>>) -> Option<SignalEvent> {
    match events {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

async fn recv_shutdown(shutdown: &mut Option<mpsc::Receiver<()>>) -> Option<()> {
    match shutdown {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

#[cfg(unix)]
mod os {
    use tokio::signal::unix::{signal, SignalKind};
    use tokio::sync::mpsc;

    use super::SignalEvent;

    pub(super) fn forward(tx: mpsc::Sender<SignalEvent>) -> std::io::Result<()> {
        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sighup = signal(SignalKind::hangup())?;
        let mut sigpipe = signal(SignalKind::pipe())?;

        tokio::spawn(async move {
            loop {
                let event = tokio::select! {
                    _ = sigint.recv() => SignalEvent::Interrupt,
                    _ = sigterm.recv() => SignalEvent::Terminate,
                    _ = sighup.recv() => SignalEvent::Reload,
                    _ = sigpipe.recv() => SignalEvent::Ignorable,
                };
                if tx.send(event).await.is_err() {
                    break;
                }
            }
        });
        Ok(())
    }
}

#[cfg(not(unix))]
mod os {
    use tokio::sync::mpsc;

    use super::SignalEvent;

    pub(super) fn forward(tx: mpsc::Sender<SignalEvent>) -> std::io::Result<()> {
        tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                if tx.send(SignalEvent::Interrupt).await.is_err() {
                    break;
                }
            }
        });
        Ok(())
    }
}
