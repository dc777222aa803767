//! Command failures. The `Display` text is what the caller sees.

use mc_01_ledger_store::LedgerError;
use shared_types::{Classify, ErrorKind};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("usage: {usage}")]
    Malformed { usage: &'static str },

    #[error("only admins can use {command}")]
    Unauthorized { command: &'static str },

    #[error("not enough points: you have {available}, need {required}")]
    InsufficientFunds { required: i64, available: i64 },

    #[error("not enough savings: you have {available} banked, need {required}")]
    InsufficientSavings { required: i64, available: i64 },

    #[error("you already own that item")]
    AlreadyOwned,

    #[error("no such item '{0}', see !shop")]
    UnknownItem(String),

    #[error("no identity named '{0}'")]
    NotFound(String),

    #[error("the name '{0}' is already in use")]
    NameTaken(String),

    #[error("you need a rename ticket first, see !shop")]
    NoTicket,

    /// Details are logged, not shown.
    #[error("internal error, nothing was changed")]
    Internal(String),
}

impl From<LedgerError> for CommandError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InsufficientFunds {
                required,
                available,
            } => CommandError::InsufficientFunds {
                required,
                available,
            },
            LedgerError::AlreadyOwned => CommandError::AlreadyOwned,
            LedgerError::NotFound(name) => CommandError::NotFound(name),
            LedgerError::NameTaken(name) => CommandError::NameTaken(name),
            LedgerError::Forbidden => CommandError::Unauthorized { command: "this" },
            other => CommandError::Internal(other.to_string()),
        }
    }
}

impl Classify for CommandError {
    fn kind(&self) -> ErrorKind {
        match self {
            CommandError::Malformed { .. } => ErrorKind::MalformedCommand,
            CommandError::Unauthorized { .. } | CommandError::NoTicket => ErrorKind::Unauthorized,
            CommandError::AlreadyOwned => ErrorKind::Unauthorized,
            CommandError::InsufficientFunds { .. } | CommandError::InsufficientSavings { .. } => {
                ErrorKind::InsufficientFunds
            }
            CommandError::UnknownItem(_) | CommandError::NotFound(_) => ErrorKind::NotFound,
            CommandError::NameTaken(_) => ErrorKind::NameTaken,
            CommandError::Internal(_) => ErrorKind::Internal,
        }
    }
}
