//! # Error Types
//!
//! The user-visible error taxonomy. Each component keeps its own error enum
//! and classifies it into an `ErrorKind` so callers can react uniformly.

use thiserror::Error;

/// Error classes shared by every component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum ErrorKind {
    /// Display name is held live or already has a ledger record.
    #[error("name taken")]
    NameTaken,

    /// Message exceeds the length or line-break limits.
    #[error("policy violation")]
    PolicyViolation,

    /// Balance too low for the requested debit.
    #[error("insufficient funds")]
    InsufficientFunds,

    /// Referenced identity or item does not exist.
    #[error("not found")]
    NotFound,

    /// Caller lacks the admin role or a required item.
    #[error("unauthorized")]
    Unauthorized,

    /// Command arguments could not be parsed.
    #[error("malformed command")]
    MalformedCommand,

    /// Storage or other internal failure. No partial mutation is visible.
    #[error("internal error")]
    Internal,
}

/// Implemented by every component error so the session layer can classify it.
pub trait Classify {
    fn kind(&self) -> ErrorKind;
}
