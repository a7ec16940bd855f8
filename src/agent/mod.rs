//! The clustered agent the lifecycle controller drives.
//!
//! # Responsibilities
//! - Bring the local node up from an [`AgentConfig`]
//! - Best-effort graceful departure from the cluster ([`Agent::leave`])
//! - Unconditional teardown ([`Agent::shutdown`])
//!
//! # States
//! ```text
//! Alive → Leaving → Left
//! any   → Shutdown
//! ```

use std::fs;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Mutex;

use serde::Serialize;
use thiserror::Error;

use crate::config::AgentConfig;

/// Errors raised by the agent.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("failed to create data dir {path}: {source}")]
    DataDir {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("configuration has no normalized addresses")]
    NotNormalized,

    #[error("cannot leave: agent is {0}")]
    NotAlive(AgentState),
}

/// Membership state of the local node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentState {
    Alive,
    Leaving,
    Left,
    Shutdown,
}

impl std::fmt::Display for AgentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AgentState::Alive => "alive",
            AgentState::Leaving => "leaving",
            AgentState::Left => "left",
            AgentState::Shutdown => "shutdown",
        };
        f.write_str(s)
    }
}

/// Operations the lifecycle controller needs from a running agent.
pub trait Agent: Send + Sync + 'static {
    /// Leave the cluster gracefully. May take arbitrarily long.
    fn leave(&self) -> impl Future<Output = Result<(), AgentError>> + Send;

    /// Tear the agent down. Runs on every exit path.
    fn shutdown(&self) -> impl Future<Output = ()> + Send;
}

/// Identity a node advertises to its peers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeInfo {
    pub name: String,
    pub region: String,
    pub datacenter: String,
    pub rpc_addr: SocketAddr,
    pub serf_addr: SocketAddr,
}

/// Single-node agent.
#[derive(Debug)]
pub struct LocalAgent {
    node: NodeInfo,
    state: Mutex<AgentState>,
}

impl LocalAgent {
    /// Bring the agent up. Fails if the data dir cannot be created or the
    /// config was never normalized.
    pub fn start(config: &AgentConfig) -> Result<Self, AgentError> {
        let addrs = config.normalized.ok_or(AgentError::NotNormalized)?;

        if let Some(dir) = config.data_dir.as_deref().filter(|d| !d.is_empty()) {
            fs::create_dir_all(dir).map_err(|source| AgentError::DataDir {
                path: dir.to_string(),
                source,
            })?;
        }

        let name = if config.node_name.is_empty() {
            default_node_name()
        } else {
            config.node_name.clone()
        };

        let node = NodeInfo {
            name,
            region: config.region.clone(),
            datacenter: config.datacenter.clone(),
            rpc_addr: addrs.advertise_rpc,
            serf_addr: addrs.advertise_serf,
        };

        tracing::info!(
            node = %node.name,
            region = %node.region,
            datacenter = %node.datacenter,
            serf = %node.serf_addr,
            "Agent started"
        );

        Ok(Self {
            node,
            state: Mutex::new(AgentState::Alive),
        })
    }

    pub fn node(&self) -> &NodeInfo {
        &self.node
    }

    pub fn state(&self) -> AgentState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn transition(&self, from: AgentState, to: AgentState) -> Result<(), AgentError> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if *state != from {
            return Err(AgentError::NotAlive(*state));
        }
        tracing::debug!(node = %self.node.name, from = %from, to = %to, "Agent state change");
        *state = to;
        Ok(())
    }
}

impl Agent for LocalAgent {
    async fn leave(&self) -> Result<(), AgentError> {
        self.transition(AgentState::Alive, AgentState::Leaving)?;
        tracing::info!(node = %self.node.name, "Leaving cluster");
        // Single node: no peers to notify.
        tokio::task::yield_now().await;
        self.transition(AgentState::Leaving, AgentState::Left)?;
        tracing::info!(node = %self.node.name, "Left cluster");
        Ok(())
    }

    async fn shutdown(&self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let previous = *state;
        if previous != AgentState::Shutdown {
            tracing::info!(node = %self.node.name, previous = %previous, "Agent shutting down");
            *state = AgentState::Shutdown;
        }
    }
}

fn default_node_name() -> String {
    std::env::var("HOSTNAME")
        .ok()
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| "maya-agent".to_string())
}
