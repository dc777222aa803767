//! # Core Domain Entities

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque handle for one live transport connection.
///
/// Valid from `connect` until `disconnect`; never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Allocate a fresh, globally unique connection id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID (used by transports that already mint ids).
    #[must_use]
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    #[must_use]
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Persistent ledger row for one display name.
///
/// `balance` and `bank` are signed; non-negativity is enforced by the
/// commands that debit them, not by storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityRecord {
    /// Primary key.
    pub name: String,
    pub balance: i64,
    /// Savings moved out of `balance` with the deposit command.
    pub bank: i64,
    /// Role flag set by out-of-band provisioning.
    pub is_admin: bool,
    /// Holds an unused rename ticket.
    pub has_ticket: bool,
    /// Insertion sequence. Tie-breaker for rankings; survives renames.
    pub seq: u64,
}

impl IdentityRecord {
    /// A brand-new record with zero balance and no flags.
    pub fn new(name: impl Into<String>, seq: u64) -> Self {
        Self {
            name: name.into(),
            balance: 0,
            bank: 0,
            is_admin: false,
            has_ticket: false,
            seq,
        }
    }

    /// Apply a partial update in place.
    ///
    /// Balance arithmetic saturates instead of wrapping.
    pub fn apply(&mut self, update: &RecordUpdate) {
        if let Some(delta) = update.balance_delta {
            self.balance = self.balance.saturating_add(delta);
        }
        if let Some(delta) = update.bank_delta {
            self.bank = self.bank.saturating_add(delta);
        }
        if let Some(is_admin) = update.is_admin {
            self.is_admin = is_admin;
        }
        if let Some(has_ticket) = update.has_ticket {
            self.has_ticket = has_ticket;
        }
    }
}

/// Partial update applied by `upsert` / `rename`.
///
/// Every field is optional; `None` leaves the stored value unchanged.
/// `balance_delta` and `bank_delta` are added to the current values
/// atomically.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordUpdate {
    pub balance_delta: Option<i64>,
    pub bank_delta: Option<i64>,
    pub is_admin: Option<bool>,
    pub has_ticket: Option<bool>,
}

impl RecordUpdate {
    /// An update that only ensures the record exists.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn credit(amount: i64) -> Self {
        Self {
            balance_delta: Some(amount),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn debit(amount: i64) -> Self {
        Self {
            balance_delta: Some(-amount),
            ..Self::default()
        }
    }

    /// Move `amount` from the balance into the bank. Negative amounts move
    /// money back out.
    #[must_use]
    pub fn bank_transfer(amount: i64) -> Self {
        Self {
            balance_delta: Some(-amount),
            bank_delta: Some(amount),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_admin(mut self, is_admin: bool) -> Self {
        self.is_admin = Some(is_admin);
        self
    }

    #[must_use]
    pub fn with_ticket(mut self, has_ticket: bool) -> Self {
        self.has_ticket = Some(has_ticket);
        self
    }

    /// True when applying this update changes nothing.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        matches!(self.balance_delta, None | Some(0))
            && matches!(self.bank_delta, None | Some(0))
            && self.is_admin.is_none()
            && self.has_ticket.is_none()
    }
}
