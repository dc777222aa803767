//! # Outbox
//!
//! Receiving end of one connection's delivery queue. Owned by the transport
//! writer task for that connection.

use shared_types::{ConnectionId, OutboundEvent};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

/// The dispatcher dropped this outbox (disconnect or overflow).
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("outbox closed")]
pub struct OutboxClosed;

/// Per-connection queue of pending outbound events.
///
/// Dropping the outbox makes every later delivery to the connection a no-op.
pub struct Outbox {
    connection_id: ConnectionId,
    receiver: mpsc::Receiver<Arc<OutboundEvent>>,
}

impl Outbox {
    pub(crate) fn new(
        connection_id: ConnectionId,
        receiver: mpsc::Receiver<Arc<OutboundEvent>>,
    ) -> Self {
        Self {
            connection_id,
            receiver,
        }
    }

    pub fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    /// Next queued event, or `None` once the dispatcher has dropped the queue
    /// and it is drained.
    pub async fn recv(&mut self) -> Option<Arc<OutboundEvent>> {
        self.receiver.recv().await
    }

    /// Non-blocking receive.
    pub fn try_recv(&mut self) -> Result<Option<Arc<OutboundEvent>>, OutboxClosed> {
        match self.receiver.try_recv() {
            Ok(event) => Ok(Some(event)),
            Err(mpsc::error::TryRecvError::Empty) => Ok(None),
            Err(mpsc::error::TryRecvError::Disconnected) => Err(OutboxClosed),
        }
    }

    /// Everything queued right now, in order.
    pub fn drain(&mut self) -> Vec<Arc<OutboundEvent>> {
        let mut events = Vec::new();
        while let Ok(event) = self.receiver.try_recv() {
            events.push(event);
        }
        events
    }

    /// Consume into a `Stream` for `StreamExt`-style forwarding.
    pub fn into_stream(self) -> ReceiverStream<Arc<OutboundEvent>> {
        ReceiverStream::new(self.receiver)
    }
}
