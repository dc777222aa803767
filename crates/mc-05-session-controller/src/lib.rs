//! # mc-05-session-controller
//!
//! Per-connection state machine and the only component that touches the
//! ledger, the registry, the interpreter and the dispatcher together.
//!
//! ## State machine
//!
//! ```text
//!              connect                claimName(ok)
//!   (none) ───────────► Unidentified ──────────────► Active ──┐
//!                            │                        │  ▲    │ message
//!                            │ disconnect  disconnect │  └────┘ rename
//!                            ▼                        ▼
//!                          Closed ◄───────────────────┘
//! ```
//!
//! ## Ordering
//!
//! - Each connection's events are handled one at a time by its `SessionWorker`
//! - Renames across all connections are serialized by one ordering lock and
//!   run reserve → ledger rename → registry rebind
//! - Nothing holds a lock while waiting on the network; delivery is a
//!   non-blocking enqueue

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod config;
pub mod domain;
pub mod service;
pub mod worker;

pub use config::SessionConfig;
pub use domain::errors::SessionError;
pub use domain::policy::{MessagePolicy, PolicyViolation};
pub use domain::state::SessionState;
pub use service::{SessionController, SessionDependencies};
pub use worker::{SessionHandle, SessionWorker};
