//! # Chat Runtime Library
//!
//! Exposes the server's modules for the binary and for tests.
//!
//! - `container/` - configuration and component wiring
//! - `transport/` - WebSocket frame codec and socket pump
//! - `server` - axum router and lifecycle

pub mod container;
pub mod server;
pub mod transport;

pub use container::{ChatConfig, ChatContainer, ConfigError, StorageBackend};
pub use server::ChatServer;
