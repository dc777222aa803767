//! # Multiverse Chat Server
//!
//! ```text
//! client ──ws──► reader ──► SessionWorker ──► SessionController
//!                                                 │ ledger / registry / interpreter
//! client ◄──ws── writer ◄── Outbox ◄── Dispatcher ◄┘
//! ```

use anyhow::{Context, Result};
use chat_runtime::{ChatConfig, ChatServer};
use chat_telemetry::{init_telemetry, TelemetryConfig};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    init_telemetry(&TelemetryConfig::from_env()).context("failed to initialize telemetry")?;

    let config = ChatConfig::from_env().context("invalid configuration")?;
    info!(
        bind_addr = %config.bind_addr,
        data_dir = %config.storage.data_dir.display(),
        backend = ?config.storage.backend,
        admins = config.admins.len(),
        "Starting Multiverse Chat"
    );

    let server = std::sync::Arc::new(ChatServer::new(config).context("failed to open ledger")?);

    let serving = {
        let server = std::sync::Arc::clone(&server);
        tokio::spawn(async move { server.start().await })
    };

    info!("Server is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;
    server.shutdown();

    serving.await.context("server task panicked")??;
    Ok(())
}
