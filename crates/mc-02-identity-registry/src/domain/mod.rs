//! Registry outcomes and errors.

use shared_types::{Classify, ErrorKind};
use thiserror::Error;

/// Successful result of `claim`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// The name is now bound to the connection. `previous` is the name the
    /// connection held before, if any.
    Claimed { previous: Option<String> },
    /// The connection already holds exactly this name. Nothing changed.
    AlreadyClaimedBySelf,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// Another live connection holds (or has reserved) the name.
    #[error("name '{0}' is in use")]
    NameTaken(String),

    /// The connection holds no name.
    #[error("connection has no bound name")]
    NotBound,
}

impl Classify for RegistryError {
    fn kind(&self) -> ErrorKind {
        match self {
            RegistryError::NameTaken(_) => ErrorKind::NameTaken,
            RegistryError::NotBound => ErrorKind::NotFound,
        }
    }
}
