//! # mc-02-identity-registry
//!
//! In-memory map of which live connection holds which display name.
//!
//! ## Guarantees
//!
//! - At most one live connection per name, at most one name per connection
//! - Both directions are updated under one lock, so they never disagree
//! - Renames are two-phase: `reserve` holds the new name next to the old one,
//!   `rebind` commits, `cancel_reservation` rolls back. While reserved, neither
//!   name can be claimed by anyone else.
//!
//! ```text
//!   claim ──► [conn ⇄ name] ──reserve──► [conn ⇄ old, conn ⇠ new]
//!                  ▲                              │
//!                  └────────── rebind ◄───────────┘
//! ```

pub mod domain;
pub mod registry;

pub use domain::{ClaimOutcome, RegistryError};
pub use registry::IdentityRegistry;
