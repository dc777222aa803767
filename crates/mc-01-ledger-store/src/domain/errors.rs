//! Ledger error types.

use shared_types::{Classify, ErrorKind};
use std::fmt;
use thiserror::Error;

/// Errors surfaced by `LedgerStore` operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// Rename target already has a record.
    #[error("name '{0}' is already taken")]
    NameTaken(String),

    #[error("no record for '{0}'")]
    NotFound(String),

    /// Raised from inside an `update_existing` check.
    #[error("insufficient funds: need {required}, have {available}")]
    InsufficientFunds { required: i64, available: i64 },

    /// Raised from inside an `update_existing` check.
    #[error("item already owned")]
    AlreadyOwned,

    /// Raised from inside an `update_existing` check for role-gated mutations.
    #[error("not permitted")]
    Forbidden,

    #[error("storage failure: {0}")]
    Storage(String),

    #[error("record encoding failure: {0}")]
    Serialization(String),

    #[error("invalid legacy data: {0}")]
    InvalidLegacyData(String),
}

impl Classify for LedgerError {
    fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::NameTaken(_) => ErrorKind::NameTaken,
            LedgerError::NotFound(_) => ErrorKind::NotFound,
            LedgerError::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            LedgerError::AlreadyOwned | LedgerError::Forbidden => ErrorKind::Unauthorized,
            LedgerError::Storage(_)
            | LedgerError::Serialization(_)
            | LedgerError::InvalidLegacyData(_) => ErrorKind::Internal,
        }
    }
}

/// Key-value backend errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KVStoreError {
    /// I/O error during read/write.
    IOError { message: String },
    /// Data corruption in the store.
    CorruptionError { message: String },
    /// Another process holds the store lock.
    Locked { path: String },
}

impl fmt::Display for KVStoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KVStoreError::IOError { message } => write!(f, "KV store I/O error: {}", message),
            KVStoreError::CorruptionError { message } => {
                write!(f, "KV store corruption: {}", message)
            }
            KVStoreError::Locked { path } => {
                write!(f, "KV store {} is locked by another process", path)
            }
        }
    }
}

impl std::error::Error for KVStoreError {}

impl From<KVStoreError> for LedgerError {
    fn from(err: KVStoreError) -> Self {
        LedgerError::Storage(err.to_string())
    }
}
