use mc_01_ledger_store::LedgerError;
use shared_types::{Classify, ConnectionId, ErrorKind};
use thiserror::Error;

/// Failures returned to the transport. User-facing rejections are delivered
/// as events instead and never show up here.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// The connection was never opened or is already closed.
    #[error("connection {0} is closed")]
    Closed(ConnectionId),

    #[error("ledger failure: {0}")]
    Ledger(#[from] LedgerError),
}

impl Classify for SessionError {
    fn kind(&self) -> ErrorKind {
        match self {
            SessionError::Closed(_) => ErrorKind::NotFound,
            SessionError::Ledger(e) => e.kind(),
        }
    }
}
