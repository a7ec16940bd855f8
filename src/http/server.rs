//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with the agent status and log handlers
//! - Wire up request tracing
//! - Serve on the normalized HTTP address
//! - Stop on [`HttpHandle::shutdown`], on every exit path of the agent

use std::net::SocketAddr;
use std::sync::Arc;

use arc_swap::ArcSwap;
use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;

use crate::agent::{AgentState, LocalAgent, NodeInfo};
use crate::config::AgentConfig;
use crate::observability::LogBuffer;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Active configuration, swapped by the lifecycle controller on reload.
    pub config: Arc<ArcSwap<AgentConfig>>,
    pub agent: Arc<LocalAgent>,
    /// Recent log lines.
    pub logs: LogBuffer,
}

/// HTTP API for the agent.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(state: AppState) -> Self {
        Self {
            router: Self::build_router(state),
        }
    }

    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/v1/agent/self", get(agent_self))
            .route("/v1/agent/health", get(agent_health))
            .route("/v1/agent/logs", get(agent_logs))
            .with_state(state)
            .layer(TraceLayer::new_for_http())
    }

    /// Bind `addr` and serve in the background.
    pub async fn start(self, addr: SocketAddr) -> Result<HttpHandle, std::io::Error> {
        let listener = TcpListener::bind(addr).await?;
        self.run(listener)
    }

    /// Serve on an already bound listener in the background.
    pub fn run(self, listener: TcpListener) -> Result<HttpHandle, std::io::Error> {
        let local_addr = listener.local_addr()?;
        let (stop_tx, stop_rx) = oneshot::channel::<()>();

        tracing::info!(address = %local_addr, "HTTP server starting");

        let router = self.router;
        let task = tokio::spawn(async move {
            let result = axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    // Sender dropped counts as a stop request too.
                    let _ = stop_rx.await;
                })
                .await;
            if let Err(e) = &result {
                tracing::error!(error = %e, "HTTP server failed");
            }
            tracing::info!("HTTP server stopped");
            result
        });

        Ok(HttpHandle {
            local_addr,
            stop_tx: Some(stop_tx),
            task,
        })
    }
}

/// Handle to a running HTTP server.
pub struct HttpHandle {
    local_addr: SocketAddr,
    stop_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<Result<(), std::io::Error>>,
}

impl HttpHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting connections and wait for in-flight requests.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "HTTP server task ended abnormally");
        }
    }
}

#[derive(Serialize)]
struct AgentSelf {
    config: AgentConfig,
    member: NodeInfo,
    state: AgentState,
}

async fn agent_self(State(state): State<AppState>) -> Json<AgentSelf> {
    Json(AgentSelf {
        config: AgentConfig::clone(&state.config.load()),
        member: state.agent.node().clone(),
        state: state.agent.state(),
    })
}

#[derive(Serialize)]
struct Health {
    ok: bool,
}

async fn agent_health(State(state): State<AppState>) -> Json<Health> {
    Json(Health {
        ok: state.agent.state() == AgentState::Alive,
    })
}

#[derive(Serialize)]
struct Logs {
    lines: Vec<String>,
}

async fn agent_logs(State(state): State<AppState>) -> Json<Logs> {
    Json(Logs {
        lines: state.logs.lines(),
    })
}
