//! # Shared Types Crate
//!
//! This crate contains the domain entities and event vocabulary passed between
//! the Multiverse Chat components.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: All cross-component types are defined here.
//! - **Name is the key**: An `IdentityRecord` is addressed by its display name;
//!   a live connection is addressed by its opaque `ConnectionId`.
//! - **Transport-agnostic events**: `InboundEvent` and `OutboundEvent` carry no
//!   framing. The transport adapter serializes them (serde, `type` tag).

pub mod entities;
pub mod errors;
pub mod events;

pub use entities::*;
pub use errors::*;
pub use events::*;
