//! # Dispatcher - Outbound Fan-out to Live Connections
//!
//! Routes `OutboundEvent`s to one connection (`reply_to`) or to every live
//! connection (`broadcast`).
//!
//! ```text
//!                       ┌──────────────┐
//!   reply_to(conn) ───► │  Dispatcher  │ ──► [outbox conn-1] ──► transport writer
//!   broadcast()    ───► │  (snapshot)  │ ──► [outbox conn-2] ──► transport writer
//!                       └──────────────┘ ──► [outbox conn-3] ──► transport writer
//! ```
//!
//! ## Delivery rules
//!
//! - **Best effort**: sending to a connection that is gone is a no-op
//! - **Per-connection FIFO**: each outbox is a bounded `mpsc` queue
//! - **Snapshot broadcast**: the recipient set is captured before sending, so a
//!   connection registered mid-broadcast may miss that event
//! - **Bounded**: a full outbox either drops the event or disconnects the slow
//!   client, per `OverflowPolicy`

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod dispatcher;
pub mod outbox;

pub use dispatcher::{Dispatcher, DispatcherConfig, InMemoryDispatcher, OverflowPolicy};
pub use outbox::{Outbox, OutboxClosed};

/// Default per-connection queue depth.
pub const DEFAULT_OUTBOX_CAPACITY: usize = 1000;
