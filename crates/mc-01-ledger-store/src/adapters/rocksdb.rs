//! # RocksDB Storage Adapter
//!
//! RocksDB implementation of the `KeyValueStore` port.
//!
//! ## Features
//!
//! - Atomic batch writes (`WriteBatch`), used for renames
//! - Snappy compression
//! - Bloom filters for point lookups by name
//! - fsync on write for durability

use parking_lot::RwLock;
use rocksdb::{IteratorMode, Options, WriteBatch, WriteOptions, DB};
use std::path::Path;
use std::sync::Arc;

use crate::domain::errors::KVStoreError;
use crate::ports::outbound::{BatchOperation, KeyValueStore};

/// RocksDB configuration.
#[derive(Debug, Clone)]
pub struct RocksDbConfig {
    /// Path to the database directory
    pub path: String,
    /// Block cache size in bytes (default: 32MB)
    pub block_cache_size: usize,
    /// Write buffer size in bytes (default: 8MB)
    pub write_buffer_size: usize,
    /// Enable fsync after each write (default: true for durability)
    pub sync_writes: bool,
}

impl Default for RocksDbConfig {
    fn default() -> Self {
        Self {
            path: "./data/ledger-rocksdb".to_string(),
            block_cache_size: 32 * 1024 * 1024,
            write_buffer_size: 8 * 1024 * 1024,
            sync_writes: true,
        }
    }
}

impl RocksDbConfig {
    /// Create config for testing (smaller buffers, no sync)
    pub fn for_testing(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            block_cache_size: 4 * 1024 * 1024,
            write_buffer_size: 1024 * 1024,
            sync_writes: false,
        }
    }
}

/// RocksDB-backed key-value store.
pub struct RocksDbStore {
    db: Arc<RwLock<DB>>,
    config: RocksDbConfig,
}

impl RocksDbStore {
    /// Open or create a RocksDB database
    pub fn open(config: RocksDbConfig) -> Result<Self, KVStoreError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.set_write_buffer_size(config.write_buffer_size);
        opts.set_compression_type(rocksdb::DBCompressionType::Snappy);

        let mut block_opts = rocksdb::BlockBasedOptions::default();
        block_opts.set_bloom_filter(10.0, false);
        block_opts.set_block_cache(&rocksdb::Cache::new_lru_cache(config.block_cache_size));
        opts.set_block_based_table_factory(&block_opts);

        let db = DB::open(&opts, &config.path).map_err(|e| KVStoreError::IOError {
            message: format!("Failed to open RocksDB: {}", e),
        })?;

        tracing::info!(path = %config.path, "RocksDB ledger opened");

        Ok(Self {
            db: Arc::new(RwLock::new(db)),
            config,
        })
    }

    /// Open with default tuning at `path`.
    pub fn open_default(path: impl AsRef<Path>) -> Result<Self, KVStoreError> {
        let config = RocksDbConfig {
            path: path.as_ref().to_string_lossy().to_string(),
            ..Default::default()
        };
        Self::open(config)
    }

    fn write_options(&self) -> WriteOptions {
        let mut write_opts = WriteOptions::default();
        write_opts.set_sync(self.config.sync_writes);
        write_opts
    }
}

impl KeyValueStore for RocksDbStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, KVStoreError> {
        let db = self.db.read();
        db.get(key).map_err(|e| KVStoreError::IOError {
            message: format!("RocksDB get failed: {}", e),
        })
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), KVStoreError> {
        let write_opts = self.write_options();
        let db = self.db.write();
        db.put_opt(key, value, &write_opts)
            .map_err(|e| KVStoreError::IOError {
                message: format!("RocksDB put failed: {}", e),
            })
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), KVStoreError> {
        let write_opts = self.write_options();
        let db = self.db.write();
        db.delete_opt(key, &write_opts)
            .map_err(|e| KVStoreError::IOError {
                message: format!("RocksDB delete failed: {}", e),
            })
    }

    fn atomic_batch_write(&mut self, operations: Vec<BatchOperation>) -> Result<(), KVStoreError> {
        let mut batch = WriteBatch::default();
        for op in operations {
            match op {
                BatchOperation::Put { key, value } => batch.put(&key, &value),
                BatchOperation::Delete { key } => batch.delete(&key),
            }
        }

        let write_opts = self.write_options();
        let db = self.db.write();
        db.write_opt(batch, &write_opts)
            .map_err(|e| KVStoreError::IOError {
                message: format!("RocksDB batch write failed: {}", e),
            })
    }

    fn exists(&self, key: &[u8]) -> Result<bool, KVStoreError> {
        let db = self.db.read();
        db.get_pinned(key)
            .map(|v| v.is_some())
            .map_err(|e| KVStoreError::IOError {
                message: format!("RocksDB exists check failed: {}", e),
            })
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, KVStoreError> {
        let db = self.db.read();
        let mut results = Vec::new();

        for item in db.iterator(IteratorMode::From(prefix, rocksdb::Direction::Forward)) {
            let (key, value) = item.map_err(|e| KVStoreError::IOError {
                message: format!("RocksDB scan failed: {}", e),
            })?;
            if !key.starts_with(prefix) {
                break;
            }
            results.push((key.to_vec(), value.to_vec()));
        }

        Ok(results)
    }
}
