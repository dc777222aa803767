//! # Session Worker
//!
//! One task per connection. Inbound events are queued on a bounded channel
//! and handled strictly in arrival order; the transport only ever talks to a
//! `SessionHandle`.

use mc_01_ledger_store::LedgerStore;
use mc_03_command_interpreter::DiceSource;
use mc_04_dispatcher::{Dispatcher, Outbox};
use shared_types::{ConnectionId, InboundEvent};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::service::SessionController;

/// Transport-side handle of one connection.
pub struct SessionHandle {
    connection_id: ConnectionId,
    inbox: mpsc::Sender<InboundEvent>,
    outbox: Option<Outbox>,
    task: JoinHandle<()>,
}

impl SessionHandle {
    pub fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    /// Queue an inbound event. Returns `false` once the worker has stopped.
    pub async fn send(&self, event: InboundEvent) -> bool {
        self.inbox.send(event).await.is_ok()
    }

    /// Clone of the inbound sender, for a reader task.
    pub fn sender(&self) -> mpsc::Sender<InboundEvent> {
        self.inbox.clone()
    }

    /// Take the outbox. Only the first call returns it.
    pub fn take_outbox(&mut self) -> Option<Outbox> {
        self.outbox.take()
    }

    /// Close the inbox and wait for the worker to process the disconnect.
    pub async fn close(self) {
        let SessionHandle { inbox, task, .. } = self;
        drop(inbox);
        if let Err(e) = task.await {
            warn!(error = %e, "Session worker ended abnormally");
        }
    }
}

/// Spawns and runs per-connection workers.
pub struct SessionWorker<L, D, R>
where
    L: LedgerStore,
    D: Dispatcher,
    R: DiceSource,
{
    controller: Arc<SessionController<L, D, R>>,
    shutdown: watch::Receiver<bool>,
}

impl<L, D, R> SessionWorker<L, D, R>
where
    L: LedgerStore + 'static,
    D: Dispatcher + 'static,
    R: DiceSource + 'static,
{
    pub fn new(
        controller: Arc<SessionController<L, D, R>>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            controller,
            shutdown,
        }
    }

    /// Open a connection and start its worker task.
    pub fn spawn(&self) -> SessionHandle {
        let connection_id = ConnectionId::new();
        let outbox = self.controller.connect(connection_id);
        let (inbox, rx) = mpsc::channel(self.controller.config().inbox_capacity.max(1));

        let task = tokio::spawn(run(
            Arc::clone(&self.controller),
            connection_id,
            rx,
            self.shutdown.clone(),
        ));

        SessionHandle {
            connection_id,
            inbox,
            outbox: Some(outbox),
            task,
        }
    }
}

async fn run<L, D, R>(
    controller: Arc<SessionController<L, D, R>>,
    conn: ConnectionId,
    mut inbox: mpsc::Receiver<InboundEvent>,
    mut shutdown: watch::Receiver<bool>,
) where
    L: LedgerStore + 'static,
    D: Dispatcher + 'static,
    R: DiceSource + 'static,
{
    debug!(connection_id = %conn, "Session worker started");

    loop {
        tokio::select! {
            event = inbox.recv() => {
                let Some(event) = event else { break };
                let is_disconnect = matches!(event, InboundEvent::Disconnect);
                handle_blocking(&controller, conn, event).await;
                if is_disconnect {
                    return;
                }
            }
            _ = shutdown.changed() => {
                info!(connection_id = %conn, "Shutdown signal received");
                break;
            }
        }
    }

    handle_blocking(&controller, conn, InboundEvent::Disconnect).await;
    debug!(connection_id = %conn, "Session worker stopped");
}

/// Run one event on the blocking pool. Ledger writes may fsync a snapshot
/// file, which must not happen on a runtime thread. Awaiting each call keeps
/// events of one connection in order.
async fn handle_blocking<L, D, R>(
    controller: &Arc<SessionController<L, D, R>>,
    conn: ConnectionId,
    event: InboundEvent,
) where
    L: LedgerStore + 'static,
    D: Dispatcher + 'static,
    R: DiceSource + 'static,
{
    let controller = Arc::clone(controller);
    let handled = tokio::task::spawn_blocking(move || controller.handle(conn, event)).await;
    match handled {
        Ok(Ok(())) => {}
        Ok(Err(e)) => debug!(connection_id = %conn, error = %e, "Event dropped"),
        Err(e) => warn!(connection_id = %conn, error = %e, "Session handler task failed"),
    }
}
