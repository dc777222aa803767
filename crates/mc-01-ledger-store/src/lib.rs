//! # mc-01-ledger-store
//!
//! Durable ledger of identity records for Multiverse Chat.
//!
//! ## Role in System
//!
//! - **Single Source of Truth** for balances, the admin role and inventory
//! - **Linearizable**: every operation runs under one store lock, so concurrent
//!   credits never lose an update
//! - **Atomic rename**: the old record disappears and the new one appears in a
//!   single batch write
//!
//! ## Layout
//!
//! ```text
//!   LedgerStore (inbound port)
//!        │
//!        ▼
//!   KvLedgerStore<S> ──────────► KeyValueStore (outbound port)
//!                                  ├── InMemoryKVStore    (tests)
//!                                  ├── FileBackedKVStore  (default)
//!                                  └── RocksDbStore       (feature "rocksdb")
//! ```
//!
//! ## Keys
//!
//! | Key | Value |
//! |-----|-------|
//! | `user:<name>` | bincode `StoredRecord` |
//! | `meta:next_seq` | u64 big-endian |

pub mod adapters;
pub mod domain;
pub mod migration;
pub mod ports;
pub mod service;

pub use domain::errors::{KVStoreError, LedgerError};
pub use migration::import_legacy_json;
pub use ports::inbound::LedgerStore;
pub use ports::outbound::{BatchOperation, FileBackedKVStore, InMemoryKVStore, KeyValueStore};
pub use service::KvLedgerStore;

#[cfg(feature = "rocksdb")]
pub use adapters::rocksdb::{RocksDbConfig, RocksDbStore};

/// Ledger over the in-memory backend. Used by tests across the workspace.
pub type InMemoryLedger = KvLedgerStore<InMemoryKVStore>;

/// Ledger over the single-file backend.
pub type FileLedger = KvLedgerStore<FileBackedKVStore>;
