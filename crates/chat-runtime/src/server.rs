//! # Chat Server
//!
//! HTTP surface:
//!
//! | Route      | Purpose                                  |
//! |------------|------------------------------------------|
//! | `/ws`      | chat WebSocket (JSON frames)             |
//! | `/health`  | liveness plus connection counts          |
//! | `/metrics` | Prometheus text exposition               |

use axum::{
    extract::{ws::WebSocketUpgrade, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chat_telemetry::{encode_metrics, EVENTS_DROPPED, IDENTITIES_ACTIVE};
use mc_01_ledger_store::LedgerError;
use mc_04_dispatcher::Dispatcher;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info};

use crate::container::{ChatConfig, ChatContainer, ChatWorker};
use crate::transport::serve_socket;

/// Largest inbound WebSocket frame accepted, in bytes.
pub const MAX_FRAME_BYTES: usize = 64 * 1024;

#[derive(Clone)]
struct AppState {
    container: Arc<ChatContainer>,
    worker: Arc<ChatWorker>,
}

/// The running server.
pub struct ChatServer {
    container: Arc<ChatContainer>,
    worker: Arc<ChatWorker>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl ChatServer {
    /// Open storage and wire every component.
    pub fn new(config: ChatConfig) -> Result<Self, LedgerError> {
        Ok(Self::from_container(ChatContainer::new(config)?))
    }

    pub fn from_container(container: ChatContainer) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let worker = Arc::new(container.worker(shutdown_rx.clone()));
        Self {
            container: Arc::new(container),
            worker,
            shutdown_tx,
            shutdown_rx,
        }
    }

    pub fn container(&self) -> Arc<ChatContainer> {
        Arc::clone(&self.container)
    }

    pub fn router(&self) -> Router {
        let state = AppState {
            container: Arc::clone(&self.container),
            worker: Arc::clone(&self.worker),
        };

        Router::new()
            .route("/ws", get(ws_upgrade))
            .route("/health", get(health_check))
            .route("/metrics", get(metrics))
            .with_state(state)
    }

    /// Bind the configured address and serve until `shutdown`.
    pub async fn start(&self) -> std::io::Result<()> {
        let listener = TcpListener::bind(self.container.config.bind_addr).await?;
        self.serve(listener).await
    }

    /// Serve on an already-bound listener until `shutdown`.
    pub async fn serve(&self, listener: TcpListener) -> std::io::Result<()> {
        let addr: SocketAddr = listener.local_addr()?;
        info!(addr = %addr, "Chat server listening");

        let mut shutdown = self.shutdown_rx.clone();
        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move {
                let _ = shutdown.wait_for(|stop| *stop).await;
            })
            .await?;

        info!("Chat server stopped");
        Ok(())
    }

    /// Signal every session worker and the listener to stop.
    pub fn shutdown(&self) {
        info!("Initiating graceful shutdown...");
        if let Err(e) = self.shutdown_tx.send(true) {
            error!("Failed to send shutdown signal: {}", e);
        }
    }
}

async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.max_message_size(MAX_FRAME_BYTES)
        .on_upgrade(move |socket| serve_socket(socket, state.container, state.worker))
}

async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "connections": state.container.dispatcher.connection_count(),
        "online": state.container.registry.active_count(),
    }))
}

async fn metrics(State(state): State<AppState>) -> Response {
    IDENTITIES_ACTIVE.set(state.container.registry.active_count() as f64);
    EVENTS_DROPPED.set(state.container.dispatcher.events_dropped() as f64);

    match encode_metrics() {
        Ok(body) => (StatusCode::OK, body).into_response(),
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}
