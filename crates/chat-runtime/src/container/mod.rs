//! # Service Container
//!
//! Builds every component from `ChatConfig` in dependency order:
//!
//! ```text
//! ledger (+ legacy import, admin provisioning)
//!   → registry → dispatcher → session controller → session worker
//! ```

pub mod config;
pub mod services;

pub use config::{ChatConfig, ConfigError, StorageBackend};
pub use services::{ChatContainer, ChatController, ChatWorker, SharedLedger};
