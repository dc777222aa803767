//! # Inbound Port (Driving Port)
//!
//! The API the session controller and command interpreter call.

use shared_types::{IdentityRecord, RecordUpdate};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::domain::errors::LedgerError;

/// Read-check-write callback for `update_existing`.
///
/// Receives the current record and returns the update to apply, or an error
/// that aborts the operation without mutating anything.
pub type UpdateCheck<'a> = &'a dyn Fn(&IdentityRecord) -> Result<RecordUpdate, LedgerError>;

/// Durable identity ledger.
///
/// Every method is linearizable with respect to every other method.
pub trait LedgerStore: Send + Sync {
    /// Current record for `name`, if any.
    fn get(&self, name: &str) -> Result<Option<IdentityRecord>, LedgerError>;

    /// Create the record if absent (zero balance, flags false), then apply
    /// `update`. The balance delta is applied atomically.
    fn upsert(&self, name: &str, update: RecordUpdate) -> Result<IdentityRecord, LedgerError>;

    /// Apply the update computed by `check` to an existing record.
    ///
    /// `check` runs under the store lock, so its preconditions hold when the
    /// update lands. Returns `NotFound` if the record does not exist.
    fn update_existing(
        &self,
        name: &str,
        check: UpdateCheck<'_>,
    ) -> Result<IdentityRecord, LedgerError>;

    /// Atomically move the record at `old` to `new`, applying `overrides`.
    ///
    /// Fails with `NameTaken` if `new` already has a record and with
    /// `NotFound` if `old` has none.
    fn rename(
        &self,
        old: &str,
        new: &str,
        overrides: RecordUpdate,
    ) -> Result<IdentityRecord, LedgerError>;

    /// Up to `n` records by balance descending, ties by insertion order.
    fn top_n(&self, n: usize) -> Result<Vec<IdentityRecord>, LedgerError>;

    /// Snapshot of every record keyed by name.
    fn all(&self) -> Result<BTreeMap<String, IdentityRecord>, LedgerError>;
}

impl<T: LedgerStore + ?Sized> LedgerStore for Arc<T> {
    fn get(&self, name: &str) -> Result<Option<IdentityRecord>, LedgerError> {
        (**self).get(name)
    }

    fn upsert(&self, name: &str, update: RecordUpdate) -> Result<IdentityRecord, LedgerError> {
        (**self).upsert(name, update)
    }

    fn update_existing(
        &self,
        name: &str,
        check: UpdateCheck<'_>,
    ) -> Result<IdentityRecord, LedgerError> {
        (**self).update_existing(name, check)
    }

    fn rename(
        &self,
        old: &str,
        new: &str,
        overrides: RecordUpdate,
    ) -> Result<IdentityRecord, LedgerError> {
        (**self).rename(old, new, overrides)
    }

    fn top_n(&self, n: usize) -> Result<Vec<IdentityRecord>, LedgerError> {
        (**self).top_n(n)
    }

    fn all(&self) -> Result<BTreeMap<String, IdentityRecord>, LedgerError> {
        (**self).all()
    }
}
