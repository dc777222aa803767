//! # Ledger Service
//!
//! `KvLedgerStore` implements the `LedgerStore` port on top of any
//! `KeyValueStore`. A single mutex serializes all operations; the backend's
//! atomic batch write makes multi-key changes all-or-nothing.

use parking_lot::Mutex;
use shared_types::{IdentityRecord, RecordUpdate};
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::domain::errors::LedgerError;
use crate::domain::record::{self, NEXT_SEQ_KEY, USER_PREFIX};
use crate::ports::inbound::{LedgerStore, UpdateCheck};
use crate::ports::outbound::{BatchOperation, KeyValueStore};

struct Inner<S> {
    kv: S,
    next_seq: u64,
}

impl<S: KeyValueStore> Inner<S> {
    fn load(&self, name: &str) -> Result<Option<IdentityRecord>, LedgerError> {
        match self.kv.get(&record::user_key(name))? {
            Some(bytes) => Ok(Some(record::decode(name.to_string(), &bytes)?)),
            None => Ok(None),
        }
    }

    fn load_all(&self) -> Result<Vec<IdentityRecord>, LedgerError> {
        self.kv
            .prefix_scan(USER_PREFIX)?
            .into_iter()
            .map(|(key, value)| record::decode(record::name_from_key(&key)?, &value))
            .collect()
    }

    /// Persist `record`. A freshly created record also bumps the sequence
    /// counter in the same batch.
    fn store(&mut self, record: &IdentityRecord, created: bool) -> Result<(), LedgerError> {
        let mut ops = vec![BatchOperation::put(
            record::user_key(&record.name),
            record::encode(record)?,
        )];
        if created {
            ops.push(BatchOperation::put(
                NEXT_SEQ_KEY.to_vec(),
                record::encode_seq(self.next_seq + 1).to_vec(),
            ));
        }
        self.kv.atomic_batch_write(ops)?;
        if created {
            self.next_seq += 1;
        }
        Ok(())
    }
}

/// Ledger store backed by a key-value port.
pub struct KvLedgerStore<S: KeyValueStore> {
    inner: Mutex<Inner<S>>,
}

impl<S: KeyValueStore> KvLedgerStore<S> {
    /// Wrap a backend, recovering the insertion sequence counter.
    pub fn open(kv: S) -> Result<Self, LedgerError> {
        let next_seq = match kv.get(NEXT_SEQ_KEY)? {
            Some(bytes) => record::decode_seq(&bytes)?,
            None => 0,
        };
        let store = Self {
            inner: Mutex::new(Inner { kv, next_seq }),
        };
        info!(next_seq, "Ledger store ready");
        Ok(store)
    }

    /// Number of identity records.
    pub fn len(&self) -> Result<usize, LedgerError> {
        let inner = self.inner.lock();
        Ok(inner.kv.prefix_scan(USER_PREFIX)?.len())
    }

    pub fn is_empty(&self) -> Result<bool, LedgerError> {
        Ok(self.len()? == 0)
    }
}

impl<S: KeyValueStore> LedgerStore for KvLedgerStore<S> {
    fn get(&self, name: &str) -> Result<Option<IdentityRecord>, LedgerError> {
        self.inner.lock().load(name)
    }

    fn upsert(&self, name: &str, update: RecordUpdate) -> Result<IdentityRecord, LedgerError> {
        let mut inner = self.inner.lock();
        let (mut record, created) = match inner.load(name)? {
            Some(existing) => (existing, false),
            None => (IdentityRecord::new(name, inner.next_seq), true),
        };

        if !created && update.is_noop() {
            return Ok(record);
        }

        record.apply(&update);
        inner.store(&record, created)?;

        debug!(
            name,
            created,
            balance = record.balance,
            delta = update.balance_delta.unwrap_or(0),
            "Ledger upsert"
        );
        Ok(record)
    }

    fn update_existing(
        &self,
        name: &str,
        check: UpdateCheck<'_>,
    ) -> Result<IdentityRecord, LedgerError> {
        let mut inner = self.inner.lock();
        let mut record = inner
            .load(name)?
            .ok_or_else(|| LedgerError::NotFound(name.to_string()))?;

        let update = check(&record)?;
        if update.is_noop() {
            return Ok(record);
        }

        record.apply(&update);
        inner.store(&record, false)?;

        debug!(name, balance = record.balance, "Ledger checked update");
        Ok(record)
    }

    fn rename(
        &self,
        old: &str,
        new: &str,
        overrides: RecordUpdate,
    ) -> Result<IdentityRecord, LedgerError> {
        let mut inner = self.inner.lock();

        if inner.kv.exists(&record::user_key(new))? {
            return Err(LedgerError::NameTaken(new.to_string()));
        }
        let mut record = inner
            .load(old)?
            .ok_or_else(|| LedgerError::NotFound(old.to_string()))?;

        record.name = new.to_string();
        record.apply(&overrides);

        inner.kv.atomic_batch_write(vec![
            BatchOperation::delete(record::user_key(old)),
            BatchOperation::put(record::user_key(new), record::encode(&record)?),
        ])?;

        info!(old, new, "Ledger record renamed");
        Ok(record)
    }

    fn top_n(&self, n: usize) -> Result<Vec<IdentityRecord>, LedgerError> {
        let mut records = self.inner.lock().load_all()?;
        records.sort_by(|a, b| b.balance.cmp(&a.balance).then(a.seq.cmp(&b.seq)));
        records.truncate(n);
        Ok(records)
    }

    fn all(&self) -> Result<BTreeMap<String, IdentityRecord>, LedgerError> {
        let records = self.inner.lock().load_all()?;
        Ok(records.into_iter().map(|r| (r.name.clone(), r)).collect())
    }
}
