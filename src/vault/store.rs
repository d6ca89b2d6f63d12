//! The secret table: handle allocation and exclusive ownership of material.
//!
//! `SecretStore` is the only holder of plaintext key bytes.  Material is
//! kept in `Zeroizing` buffers, so every path that drops an entry (destroy,
//! vault close, a failed insert) scrubs it.
//!
//! Locking is whole-table: readers run their closure under the read lock,
//! and destroy takes the write lock.  A destroy therefore waits for every
//! in-flight read of the table and no read can start on a handle that is
//! being removed.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use zeroize::Zeroizing;

use crate::errors::{Result, VaultError};

use super::secret::{PersistenceId, SecretAttributes, SecretHandle};

static NEXT_SECRET_HANDLE: AtomicU64 = AtomicU64::new(1);

/// Next secret handle.  The counter is shared by every vault of every
/// registry in the process, so a value is handed out at most once.
fn next_handle() -> SecretHandle {
    SecretHandle::from_raw(NEXT_SECRET_HANDLE.fetch_add(1, Ordering::Relaxed))
}

/// A live secret.
pub struct SecretEntry {
    pub attributes: SecretAttributes,
    pub material: Zeroizing<Vec<u8>>,
    pub persistence_id: Option<PersistenceId>,
}

impl SecretEntry {
    pub fn new(
        attributes: SecretAttributes,
        material: Zeroizing<Vec<u8>>,
        persistence_id: Option<PersistenceId>,
    ) -> Self {
        Self {
            attributes,
            material,
            persistence_id,
        }
    }
}

impl std::fmt::Debug for SecretEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretEntry")
            .field("attributes", &self.attributes)
            .field("material", &"<redacted>")
            .field("persistence_id", &self.persistence_id)
            .finish()
    }
}

struct Table {
    open: bool,
    slots: HashMap<SecretHandle, SecretEntry>,
}

/// Secret table for one vault.
pub struct SecretStore {
    table: RwLock<Table>,
}

impl SecretStore {
    pub fn new() -> Self {
        Self {
            table: RwLock::new(Table {
                open: true,
                slots: HashMap::new(),
            }),
        }
    }

    /// Insert a fully validated secret and return its new handle.
    pub fn insert(&self, entry: SecretEntry) -> Result<SecretHandle> {
        let mut table = self.table.write();
        ensure_open(&table)?;
        let handle = next_handle();
        table.slots.insert(handle, entry);
        Ok(handle)
    }

    /// Insert several secrets atomically, preserving order in the result.
    pub fn insert_all(&self, entries: Vec<SecretEntry>) -> Result<Vec<SecretHandle>> {
        let mut table = self.table.write();
        ensure_open(&table)?;
        let mut handles = Vec::with_capacity(entries.len());
        for entry in entries {
            let handle = next_handle();
            table.slots.insert(handle, entry);
            handles.push(handle);
        }
        Ok(handles)
    }

    /// Run `f` with read access to one secret.
    ///
    /// The material reference cannot escape the closure.
    pub fn with_secret<R>(
        &self,
        handle: SecretHandle,
        f: impl FnOnce(&SecretEntry) -> Result<R>,
    ) -> Result<R> {
        let table = self.table.read();
        ensure_open(&table)?;
        let entry = table
            .slots
            .get(&handle)
            .ok_or_else(|| unknown_handle(handle))?;
        f(entry)
    }

    /// Run `f` with read access to several secrets at once, in the given order.
    pub fn with_secrets<R>(
        &self,
        handles: &[SecretHandle],
        f: impl FnOnce(&[&SecretEntry]) -> Result<R>,
    ) -> Result<R> {
        let table = self.table.read();
        ensure_open(&table)?;
        let entries = handles
            .iter()
            .map(|h| table.slots.get(h).ok_or_else(|| unknown_handle(*h)))
            .collect::<Result<Vec<_>>>()?;
        f(&entries)
    }

    /// Remove a secret.
    ///
    /// `before_remove` runs under the write lock with the entry still in
    /// place; if it fails the secret stays live and the error is returned.
    /// Its second argument is true when another live handle carries the
    /// same persistence id, i.e. the durable record is still in use.
    /// The removed entry is dropped (and scrubbed) before this returns.
    pub fn remove_with(
        &self,
        handle: SecretHandle,
        before_remove: impl FnOnce(&SecretEntry, bool) -> Result<()>,
    ) -> Result<()> {
        let mut table = self.table.write();
        ensure_open(&table)?;
        let entry = table
            .slots
            .get(&handle)
            .ok_or_else(|| unknown_handle(handle))?;
        let record_shared = entry.persistence_id.as_ref().is_some_and(|id| {
            table
                .slots
                .iter()
                .any(|(h, other)| *h != handle && other.persistence_id.as_ref() == Some(id))
        });
        before_remove(entry, record_shared)?;
        table.slots.remove(&handle);
        Ok(())
    }

    /// Close the table, scrubbing every secret.  Returns how many were dropped.
    ///
    /// Fails with `InvalidHandle` if the table was already closed.
    pub fn close(&self) -> Result<usize> {
        let mut table = self.table.write();
        ensure_open(&table)?;
        table.open = false;
        let count = table.slots.len();
        table.slots.clear();
        Ok(count)
    }

    pub fn is_open(&self) -> bool {
        self.table.read().open
    }

    /// Number of live secrets.
    pub fn len(&self) -> usize {
        self.table.read().slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fails with `InvalidHandle` once the owning vault has been closed.
    pub fn ensure_open(&self) -> Result<()> {
        ensure_open(&self.table.read())
    }
}

impl Default for SecretStore {
    fn default() -> Self {
        Self::new()
    }
}

fn ensure_open(table: &Table) -> Result<()> {
    if table.open {
        Ok(())
    } else {
        Err(VaultError::InvalidHandle(
            "vault has been deinitialized".into(),
        ))
    }
}

fn unknown_handle(handle: SecretHandle) -> VaultError {
    VaultError::InvalidHandle(format!("{handle} is unknown or destroyed"))
}
