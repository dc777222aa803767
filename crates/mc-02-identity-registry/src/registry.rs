//! Bidirectional connection ⇄ name map.

use parking_lot::RwLock;
use shared_types::ConnectionId;
use std::collections::HashMap;
use tracing::debug;

use crate::domain::{ClaimOutcome, RegistryError};

#[derive(Default)]
struct Bindings {
    by_conn: HashMap<ConnectionId, String>,
    /// Includes reserved names.
    by_name: HashMap<String, ConnectionId>,
    /// Pending rename target per connection.
    reserved: HashMap<ConnectionId, String>,
}

impl Bindings {
    fn drop_reservation(&mut self, conn: &ConnectionId) {
        if let Some(name) = self.reserved.remove(conn) {
            let still_ours = self.by_name.get(&name) == Some(conn);
            let is_bound_name = self.by_conn.get(conn) == Some(&name);
            if still_ours && !is_bound_name {
                self.by_name.remove(&name);
            }
        }
    }
}

/// Registry of live display-name bindings.
#[derive(Default)]
pub struct IdentityRegistry {
    bindings: RwLock<Bindings>,
}

impl IdentityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name` to `conn`.
    ///
    /// If `conn` already holds a different name, that name is released and
    /// reported in `ClaimOutcome::Claimed { previous }`.
    pub fn claim(&self, conn: ConnectionId, name: &str) -> Result<ClaimOutcome, RegistryError> {
        let mut b = self.bindings.write();

        match b.by_name.get(name) {
            Some(holder) if *holder == conn && b.by_conn.get(&conn).map(String::as_str) == Some(name) => {
                return Ok(ClaimOutcome::AlreadyClaimedBySelf);
            }
            Some(_) => return Err(RegistryError::NameTaken(name.to_string())),
            None => {}
        }

        b.drop_reservation(&conn);
        let previous = b.by_conn.insert(conn, name.to_string());
        if let Some(prev) = &previous {
            b.by_name.remove(prev);
        }
        b.by_name.insert(name.to_string(), conn);

        debug!(connection_id = %conn, name, previous = ?previous, "Name claimed");
        Ok(ClaimOutcome::Claimed { previous })
    }

    /// Remove every binding and reservation of `conn`. Returns the bound name.
    pub fn release(&self, conn: &ConnectionId) -> Option<String> {
        let mut b = self.bindings.write();
        b.drop_reservation(conn);
        let name = b.by_conn.remove(conn)?;
        b.by_name.remove(&name);
        debug!(connection_id = %conn, name = %name, "Name released");
        Some(name)
    }

    /// Hold `new_name` for `conn` alongside its current name.
    ///
    /// Returns the current name. Any earlier reservation of `conn` is replaced.
    pub fn reserve(&self, conn: ConnectionId, new_name: &str) -> Result<String, RegistryError> {
        let mut b = self.bindings.write();
        let current = b.by_conn.get(&conn).cloned().ok_or(RegistryError::NotBound)?;

        if current == new_name {
            return Err(RegistryError::NameTaken(new_name.to_string()));
        }
        match b.by_name.get(new_name) {
            Some(holder) if *holder != conn => {
                return Err(RegistryError::NameTaken(new_name.to_string()));
            }
            _ => {}
        }

        b.drop_reservation(&conn);
        b.by_name.insert(new_name.to_string(), conn);
        b.reserved.insert(conn, new_name.to_string());
        Ok(current)
    }

    /// Roll back a `reserve`.
    pub fn cancel_reservation(&self, conn: &ConnectionId) {
        self.bindings.write().drop_reservation(conn);
    }

    /// Move `conn`'s binding to `new_name`, releasing the old name.
    ///
    /// Commits a reservation if one exists; otherwise `new_name` must be free.
    /// Returns the old name.
    pub fn rebind(&self, conn: ConnectionId, new_name: &str) -> Result<String, RegistryError> {
        let mut b = self.bindings.write();
        let old = b.by_conn.get(&conn).cloned().ok_or(RegistryError::NotBound)?;

        if old == new_name {
            return Err(RegistryError::NameTaken(new_name.to_string()));
        }
        match b.by_name.get(new_name) {
            Some(holder) if *holder != conn => {
                return Err(RegistryError::NameTaken(new_name.to_string()));
            }
            _ => {}
        }

        if b.reserved.get(&conn).map(String::as_str) == Some(new_name) {
            b.reserved.remove(&conn);
        } else {
            b.drop_reservation(&conn);
        }
        b.by_name.remove(&old);
        b.by_name.insert(new_name.to_string(), conn);
        b.by_conn.insert(conn, new_name.to_string());

        debug!(connection_id = %conn, old = %old, new = new_name, "Name rebound");
        Ok(old)
    }

    /// True when a live connection holds or has reserved `name`.
    pub fn is_claimed(&self, name: &str) -> bool {
        self.bindings.read().by_name.contains_key(name)
    }

    /// Connection holding or reserving `name`.
    pub fn holder_of(&self, name: &str) -> Option<ConnectionId> {
        self.bindings.read().by_name.get(name).copied()
    }

    /// Name currently bound to `conn` (reservations excluded).
    pub fn name_of(&self, conn: &ConnectionId) -> Option<String> {
        self.bindings.read().by_conn.get(conn).cloned()
    }

    /// Number of connections with a bound name.
    pub fn active_count(&self) -> usize {
        self.bindings.read().by_conn.len()
    }

    /// Snapshot of every (connection, name) binding.
    pub fn snapshot(&self) -> Vec<(ConnectionId, String)> {
        self.bindings
            .read()
            .by_conn
            .iter()
            .map(|(c, n)| (*c, n.clone()))
            .collect()
    }
}
