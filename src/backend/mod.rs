//! Persistence backends behind a vault.
//!
//! A vault owns exactly one backend, injected at construction:
//! - `EphemeralBackend` (default vault): process memory only; every
//!   request to persist is refused.
//! - `FileBackend`: one durable record file per persistent secret,
//!   keyed by its persistence id.
//!
//! The secret table never knows which backend it sits on; the vault only
//! asks `supports_persistence()` during validation and calls `put`, `get`
//! and `delete` for persistent secrets.

pub mod ephemeral;
pub mod file;
pub mod format;

use crate::errors::Result;
use crate::vault::secret::PersistenceId;

pub use ephemeral::EphemeralBackend;
pub use file::FileBackend;
pub use format::SecretRecord;

/// Durable key-value storage for persistent secrets.
///
/// Implementations must be safe to call from several threads at once.
pub trait PersistenceBackend: Send + Sync {
    /// Short name used in log messages.
    fn name(&self) -> &'static str;

    /// Whether this backend can store persistent secrets at all.
    fn supports_persistence(&self) -> bool;

    /// Durably store `record` under `id`.  Must not return before the
    /// record would survive a crash.
    fn put(&self, id: &PersistenceId, record: &SecretRecord) -> Result<()>;

    /// Load the record stored under `id`; `NotFound` if there is none.
    fn get(&self, id: &PersistenceId) -> Result<SecretRecord>;

    /// Remove the record stored under `id`; `NotFound` if there is none.
    fn delete(&self, id: &PersistenceId) -> Result<()>;

    /// All identifiers currently stored, sorted.
    fn list(&self) -> Result<Vec<PersistenceId>>;

    /// Release backend resources.  Records stay in place.
    fn close(&self) -> Result<()> {
        Ok(())
    }
}
