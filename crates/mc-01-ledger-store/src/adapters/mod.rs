//! # Storage Adapters
//!
//! Production backends for the `KeyValueStore` port that need extra native
//! dependencies. Enabled through cargo features.

#[cfg(feature = "rocksdb")]
pub mod rocksdb;
