//! On-disk record layout and key scheme.

use serde::{Deserialize, Serialize};
use shared_types::IdentityRecord;

use super::errors::LedgerError;

/// Prefix of every identity key.
pub const USER_PREFIX: &[u8] = b"user:";

/// Key holding the next insertion sequence number.
pub const NEXT_SEQ_KEY: &[u8] = b"meta:next_seq";

/// Stored value for `user:<name>`. The name lives in the key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredRecord {
    pub balance: i64,
    pub bank: i64,
    pub is_admin: bool,
    pub has_ticket: bool,
    pub seq: u64,
}

impl StoredRecord {
    pub fn from_record(record: &IdentityRecord) -> Self {
        Self {
            balance: record.balance,
            bank: record.bank,
            is_admin: record.is_admin,
            has_ticket: record.has_ticket,
            seq: record.seq,
        }
    }

    pub fn into_record(self, name: String) -> IdentityRecord {
        IdentityRecord {
            name,
            balance: self.balance,
            bank: self.bank,
            is_admin: self.is_admin,
            has_ticket: self.has_ticket,
            seq: self.seq,
        }
    }
}

pub fn user_key(name: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(USER_PREFIX.len() + name.len());
    key.extend_from_slice(USER_PREFIX);
    key.extend_from_slice(name.as_bytes());
    key
}

/// Recover the display name from a `user:` key.
pub fn name_from_key(key: &[u8]) -> Result<String, LedgerError> {
    let raw = key
        .strip_prefix(USER_PREFIX)
        .ok_or_else(|| LedgerError::Serialization("key without user prefix".to_string()))?;
    String::from_utf8(raw.to_vec()).map_err(|e| LedgerError::Serialization(e.to_string()))
}

pub fn encode(record: &IdentityRecord) -> Result<Vec<u8>, LedgerError> {
    bincode::serialize(&StoredRecord::from_record(record))
        .map_err(|e| LedgerError::Serialization(e.to_string()))
}

pub fn decode(name: String, bytes: &[u8]) -> Result<IdentityRecord, LedgerError> {
    let stored: StoredRecord =
        bincode::deserialize(bytes).map_err(|e| LedgerError::Serialization(e.to_string()))?;
    Ok(stored.into_record(name))
}

pub fn encode_seq(seq: u64) -> [u8; 8] {
    seq.to_be_bytes()
}

pub fn decode_seq(bytes: &[u8]) -> Result<u64, LedgerError> {
    let raw: [u8; 8] = bytes
        .try_into()
        .map_err(|_| LedgerError::Serialization("sequence must be 8 bytes".to_string()))?;
    Ok(u64::from_be_bytes(raw))
}
