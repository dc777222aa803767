//! # Outbound Ports (Driven Ports)
//!
//! The storage interface the ledger service requires, plus the two backends
//! that ship with this crate. The RocksDB backend lives in
//! `adapters::rocksdb` behind the `rocksdb` feature.

use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::domain::errors::KVStoreError;

/// Abstract interface for key-value database operations.
pub trait KeyValueStore: Send + Sync {
    /// Get a value by key.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, KVStoreError>;

    /// Put a single key-value pair.
    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), KVStoreError>;

    /// Delete a key.
    fn delete(&mut self, key: &[u8]) -> Result<(), KVStoreError>;

    /// Execute an atomic batch write.
    ///
    /// Either ALL operations in the batch succeed, or NONE are applied.
    fn atomic_batch_write(&mut self, operations: Vec<BatchOperation>) -> Result<(), KVStoreError>;

    /// Check if a key exists.
    fn exists(&self, key: &[u8]) -> Result<bool, KVStoreError>;

    /// All key-value pairs whose key starts with `prefix`.
    fn prefix_scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, KVStoreError>;
}

/// Batch operation for atomic writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOperation {
    /// Put a key-value pair.
    Put { key: Vec<u8>, value: Vec<u8> },
    /// Delete a key.
    Delete { key: Vec<u8> },
}

impl BatchOperation {
    pub fn put(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        BatchOperation::Put {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn delete(key: impl Into<Vec<u8>>) -> Self {
        BatchOperation::Delete { key: key.into() }
    }

    fn key(&self) -> &[u8] {
        match self {
            BatchOperation::Put { key, .. } | BatchOperation::Delete { key } => key,
        }
    }
}

/// Apply a batch to a map, returning the prior value of every touched key.
fn apply_batch(
    data: &mut HashMap<Vec<u8>, Vec<u8>>,
    operations: Vec<BatchOperation>,
) -> Vec<(Vec<u8>, Option<Vec<u8>>)> {
    let mut undo = Vec::with_capacity(operations.len());
    for op in operations {
        let previous = data.get(op.key()).cloned();
        undo.push((op.key().to_vec(), previous));
        match op {
            BatchOperation::Put { key, value } => {
                data.insert(key, value);
            }
            BatchOperation::Delete { key } => {
                data.remove(&key);
            }
        }
    }
    undo
}

/// Restore a map from an undo log produced by `apply_batch`.
fn rollback(data: &mut HashMap<Vec<u8>, Vec<u8>>, undo: Vec<(Vec<u8>, Option<Vec<u8>>)>) {
    for (key, previous) in undo.into_iter().rev() {
        match previous {
            Some(value) => {
                data.insert(key, value);
            }
            None => {
                data.remove(&key);
            }
        }
    }
}

fn scan(data: &HashMap<Vec<u8>, Vec<u8>>, prefix: &[u8]) -> Vec<(Vec<u8>, Vec<u8>)> {
    data.iter()
        .filter(|(k, _)| k.starts_with(prefix))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// In-memory key-value store for unit tests.
#[derive(Default)]
pub struct InMemoryKVStore {
    data: HashMap<Vec<u8>, Vec<u8>>,
}

impl InMemoryKVStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl KeyValueStore for InMemoryKVStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, KVStoreError> {
        Ok(self.data.get(key).cloned())
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), KVStoreError> {
        self.data.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), KVStoreError> {
        self.data.remove(key);
        Ok(())
    }

    fn atomic_batch_write(&mut self, operations: Vec<BatchOperation>) -> Result<(), KVStoreError> {
        apply_batch(&mut self.data, operations);
        Ok(())
    }

    fn exists(&self, key: &[u8]) -> Result<bool, KVStoreError> {
        Ok(self.data.contains_key(key))
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, KVStoreError> {
        Ok(scan(&self.data, prefix))
    }
}

fn io_err(e: std::io::Error) -> KVStoreError {
    KVStoreError::IOError {
        message: e.to_string(),
    }
}

/// Single-file durable key-value store.
///
/// Every write rewrites the whole snapshot to a temp file, fsyncs it, and
/// renames it over the ledger file. If persisting fails the in-memory map is
/// rolled back, so readers never observe a write that is not on disk.
///
/// File format: repeated `[key_len:u32 LE][key][value_len:u32 LE][value]`.
pub struct FileBackedKVStore {
    data: HashMap<Vec<u8>, Vec<u8>>,
    path: PathBuf,
    #[cfg(feature = "locking")]
    _lock: File,
}

impl FileBackedKVStore {
    /// Open (or create) the store at `path`.
    ///
    /// With the `locking` feature an exclusive lock on `<path>.lock` is held
    /// for the lifetime of the store.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, KVStoreError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(io_err)?;
            }
        }

        #[cfg(feature = "locking")]
        let lock = Self::acquire_lock(&path)?;

        let data = match File::open(&path) {
            Ok(mut file) => {
                let mut bytes = Vec::new();
                file.read_to_end(&mut bytes).map_err(io_err)?;
                Self::decode(&bytes)?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "No existing ledger file, starting empty");
                HashMap::new()
            }
            Err(e) => return Err(io_err(e)),
        };

        info!(path = %path.display(), keys = data.len(), "Ledger file opened");

        Ok(Self {
            data,
            path,
            #[cfg(feature = "locking")]
            _lock: lock,
        })
    }

    #[cfg(feature = "locking")]
    fn acquire_lock(path: &Path) -> Result<File, KVStoreError> {
        use fs2::FileExt;

        let lock_path = path.with_extension("lock");
        let file = std::fs::OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)
            .map_err(io_err)?;
        file.try_lock_exclusive().map_err(|_| KVStoreError::Locked {
            path: lock_path.display().to_string(),
        })?;
        Ok(file)
    }

    /// Location of the ledger file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn decode(bytes: &[u8]) -> Result<HashMap<Vec<u8>, Vec<u8>>, KVStoreError> {
        fn take<'a>(bytes: &'a [u8], cursor: &mut usize) -> Result<&'a [u8], KVStoreError> {
            let corrupt = || KVStoreError::CorruptionError {
                message: format!("truncated entry at offset {}", cursor),
            };
            let len_end = cursor.checked_add(4).ok_or_else(corrupt)?;
            let len_bytes: [u8; 4] = bytes
                .get(*cursor..len_end)
                .and_then(|s| s.try_into().ok())
                .ok_or_else(corrupt)?;
            let len = u32::from_le_bytes(len_bytes) as usize;
            let end = len_end.checked_add(len).ok_or_else(corrupt)?;
            let slice = bytes.get(len_end..end).ok_or_else(corrupt)?;
            *cursor = end;
            Ok(slice)
        }

        let mut data = HashMap::new();
        let mut cursor = 0;
        while cursor < bytes.len() {
            let key = take(bytes, &mut cursor)?.to_vec();
            let value = take(bytes, &mut cursor)?.to_vec();
            data.insert(key, value);
        }
        Ok(data)
    }

    fn encode(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        for (key, value) in &self.data {
            bytes.extend_from_slice(&(key.len() as u32).to_le_bytes());
            bytes.extend_from_slice(key);
            bytes.extend_from_slice(&(value.len() as u32).to_le_bytes());
            bytes.extend_from_slice(value);
        }
        bytes
    }

    fn save_to_file(&self) -> Result<(), KVStoreError> {
        let bytes = self.encode();

        // Write atomically via temp file
        let temp_path = self.path.with_extension("tmp");
        let mut file = File::create(&temp_path).map_err(io_err)?;
        file.write_all(&bytes).map_err(io_err)?;
        file.sync_all().map_err(io_err)?;
        std::fs::rename(&temp_path, &self.path).map_err(io_err)?;

        debug!(path = %self.path.display(), bytes = bytes.len(), "Ledger snapshot written");
        Ok(())
    }

    fn commit(&mut self, operations: Vec<BatchOperation>) -> Result<(), KVStoreError> {
        let undo = apply_batch(&mut self.data, operations);
        if let Err(e) = self.save_to_file() {
            warn!(path = %self.path.display(), error = %e, "Ledger write failed, rolling back");
            rollback(&mut self.data, undo);
            return Err(e);
        }
        Ok(())
    }
}

impl KeyValueStore for FileBackedKVStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, KVStoreError> {
        Ok(self.data.get(key).cloned())
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), KVStoreError> {
        self.commit(vec![BatchOperation::put(key, value)])
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), KVStoreError> {
        self.commit(vec![BatchOperation::delete(key)])
    }

    fn atomic_batch_write(&mut self, operations: Vec<BatchOperation>) -> Result<(), KVStoreError> {
        self.commit(operations)
    }

    fn exists(&self, key: &[u8]) -> Result<bool, KVStoreError> {
        Ok(self.data.contains_key(key))
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, KVStoreError> {
        Ok(scan(&self.data, prefix))
    }
}
