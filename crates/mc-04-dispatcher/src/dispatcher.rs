//! # Dispatcher
//!
//! The `Dispatcher` trait is what the session controller delivers through.
//! `InMemoryDispatcher` keeps one bounded `mpsc` sender per live connection.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use shared_types::{ConnectionId, OutboundEvent};
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::outbox::Outbox;
use crate::DEFAULT_OUTBOX_CAPACITY;

/// What to do when a connection's outbox is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverflowPolicy {
    /// Drop the outbox; the transport sees it close and disconnects the client.
    #[default]
    Disconnect,
    /// Discard the event that did not fit and keep the connection.
    DropNewest,
}

impl FromStr for OverflowPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "disconnect" => Ok(OverflowPolicy::Disconnect),
            "drop-newest" => Ok(OverflowPolicy::DropNewest),
            other => Err(format!("unknown overflow policy '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatcherConfig {
    pub outbox_capacity: usize,
    pub overflow_policy: OverflowPolicy,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            outbox_capacity: DEFAULT_OUTBOX_CAPACITY,
            overflow_policy: OverflowPolicy::default(),
        }
    }
}

/// Outbound delivery to live connections.
///
/// All methods are non-blocking; none of them wait on network I/O.
pub trait Dispatcher: Send + Sync {
    /// Create the outbox for a new connection.
    fn register(&self, conn: ConnectionId) -> Outbox;

    /// Forget a connection. Later deliveries to it are no-ops.
    fn unregister(&self, conn: &ConnectionId);

    /// Queue `event` for `conn`. Returns whether it was enqueued.
    fn reply_to(&self, conn: &ConnectionId, event: OutboundEvent) -> bool;

    /// Queue `event` for every live connection except `exclude`.
    /// Returns the number of connections it was enqueued for.
    fn broadcast(&self, event: OutboundEvent, exclude: Option<&ConnectionId>) -> usize;

    /// Number of registered connections.
    fn connection_count(&self) -> usize;
}

impl<T: Dispatcher + ?Sized> Dispatcher for Arc<T> {
    fn register(&self, conn: ConnectionId) -> Outbox {
        (**self).register(conn)
    }

    fn unregister(&self, conn: &ConnectionId) {
        (**self).unregister(conn)
    }

    fn reply_to(&self, conn: &ConnectionId, event: OutboundEvent) -> bool {
        (**self).reply_to(conn, event)
    }

    fn broadcast(&self, event: OutboundEvent, exclude: Option<&ConnectionId>) -> usize {
        (**self).broadcast(event, exclude)
    }

    fn connection_count(&self) -> usize {
        (**self).connection_count()
    }
}

type Sender = mpsc::Sender<Arc<OutboundEvent>>;

/// In-process dispatcher.
pub struct InMemoryDispatcher {
    outboxes: DashMap<ConnectionId, Sender>,
    config: DispatcherConfig,
    events_delivered: AtomicU64,
    events_dropped: AtomicU64,
}

impl InMemoryDispatcher {
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(DispatcherConfig::default())
    }

    #[must_use]
    pub fn with_config(config: DispatcherConfig) -> Self {
        Self {
            outboxes: DashMap::new(),
            config: DispatcherConfig {
                outbox_capacity: config.outbox_capacity.max(1),
                ..config
            },
            events_delivered: AtomicU64::new(0),
            events_dropped: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Total events successfully enqueued.
    pub fn events_delivered(&self) -> u64 {
        self.events_delivered.load(Ordering::Relaxed)
    }

    /// Total events discarded because of overflow or a vanished connection.
    pub fn events_dropped(&self) -> u64 {
        self.events_dropped.load(Ordering::Relaxed)
    }

    /// Remove `conn` only if it still maps to `sender`.
    fn evict(&self, conn: &ConnectionId, sender: &Sender) {
        self.outboxes
            .remove_if(conn, |_, current| current.same_channel(sender));
    }

    fn deliver(&self, conn: &ConnectionId, sender: &Sender, event: Arc<OutboundEvent>) -> bool {
        match sender.try_send(event) {
            Ok(()) => {
                self.events_delivered.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(mpsc::error::TrySendError::Full(event)) => {
                self.events_dropped.fetch_add(1, Ordering::Relaxed);
                match self.config.overflow_policy {
                    OverflowPolicy::DropNewest => {
                        warn!(
                            connection_id = %conn,
                            event = event.label(),
                            "Outbox full, event dropped"
                        );
                    }
                    OverflowPolicy::Disconnect => {
                        warn!(
                            connection_id = %conn,
                            capacity = self.config.outbox_capacity,
                            "Outbox full, disconnecting slow client"
                        );
                        self.evict(conn, sender);
                    }
                }
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.events_dropped.fetch_add(1, Ordering::Relaxed);
                debug!(connection_id = %conn, "Outbox closed, dropping connection");
                self.evict(conn, sender);
                false
            }
        }
    }
}

impl Default for InMemoryDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher for InMemoryDispatcher {
    fn register(&self, conn: ConnectionId) -> Outbox {
        let (sender, receiver) = mpsc::channel(self.config.outbox_capacity);
        if self.outboxes.insert(conn, sender).is_some() {
            warn!(connection_id = %conn, "Connection re-registered, previous outbox replaced");
        }
        debug!(connection_id = %conn, "Outbox registered");
        Outbox::new(conn, receiver)
    }

    fn unregister(&self, conn: &ConnectionId) {
        if self.outboxes.remove(conn).is_some() {
            debug!(connection_id = %conn, "Outbox unregistered");
        }
    }

    fn reply_to(&self, conn: &ConnectionId, event: OutboundEvent) -> bool {
        let sender = match self.outboxes.get(conn) {
            Some(entry) => entry.value().clone(),
            None => {
                debug!(connection_id = %conn, event = event.label(), "Reply to unknown connection ignored");
                return false;
            }
        };
        self.deliver(conn, &sender, Arc::new(event))
    }

    fn broadcast(&self, event: OutboundEvent, exclude: Option<&ConnectionId>) -> usize {
        // Snapshot first so no map shard is locked while delivering.
        let targets: Vec<(ConnectionId, Sender)> = self
            .outboxes
            .iter()
            .filter(|entry| Some(entry.key()) != exclude)
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();

        let label = event.label();
        let event = Arc::new(event);
        let delivered = targets
            .iter()
            .filter(|(conn, sender)| self.deliver(conn, sender, Arc::clone(&event)))
            .count();

        debug!(
            event = label,
            targets = targets.len(),
            delivered,
            "Broadcast dispatched"
        );
        delivered
    }

    fn connection_count(&self) -> usize {
        self.outboxes.len()
    }
}
