//! # Legacy Import
//!
//! One-shot import of the JSON ledger format used before the key-value store:
//!
//! ```json
//! { "ada": { "money": 120, "is_admin": false, "has_nickname_change_ticket": true } }
//! ```
//!
//! Exports of the banking variant also carry `bank_money`.
//!
//! Flags may be booleans or 0/1 integers. Names already present in the store
//! are left untouched.

use serde::Deserialize;
use shared_types::RecordUpdate;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, warn};

use crate::domain::errors::LedgerError;
use crate::ports::inbound::LedgerStore;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Flag {
    Bool(bool),
    Int(i64),
}

impl Flag {
    fn as_bool(&self) -> bool {
        match self {
            Flag::Bool(b) => *b,
            Flag::Int(i) => *i != 0,
        }
    }
}

#[derive(Debug, Deserialize)]
struct LegacyEntry {
    #[serde(default)]
    money: i64,
    #[serde(default)]
    bank_money: i64,
    #[serde(default)]
    is_admin: Option<Flag>,
    #[serde(default)]
    has_nickname_change_ticket: Option<Flag>,
}

/// Import a legacy JSON ledger. Returns the number of records created.
pub fn import_legacy_json<L>(store: &L, path: impl AsRef<Path>) -> Result<usize, LedgerError>
where
    L: LedgerStore + ?Sized,
{
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path).map_err(|e| LedgerError::Storage(e.to_string()))?;
    import_legacy_str(store, &raw)
}

/// Import from an in-memory JSON document.
pub fn import_legacy_str<L>(store: &L, raw: &str) -> Result<usize, LedgerError>
where
    L: LedgerStore + ?Sized,
{
    let entries: BTreeMap<String, LegacyEntry> =
        serde_json::from_str(raw).map_err(|e| LedgerError::InvalidLegacyData(e.to_string()))?;

    let mut imported = 0;
    for (name, entry) in entries {
        if name.trim().is_empty() {
            warn!("Skipping legacy entry with empty name");
            continue;
        }
        if store.get(&name)?.is_some() {
            continue;
        }
        let update = RecordUpdate {
            balance_delta: Some(entry.money),
            bank_delta: Some(entry.bank_money),
            is_admin: Some(entry.is_admin.as_ref().is_some_and(Flag::as_bool)),
            has_ticket: Some(
                entry
                    .has_nickname_change_ticket
                    .as_ref()
                    .is_some_and(Flag::as_bool),
            ),
        };
        store.upsert(&name, update)?;
        imported += 1;
    }

    info!(imported, "Legacy ledger import finished");
    Ok(imported)
}
