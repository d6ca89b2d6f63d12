//! Backend of the default vault: nothing outlives the process.

use crate::errors::{Result, VaultError};
use crate::vault::secret::PersistenceId;

use super::{PersistenceBackend, SecretRecord};

#[derive(Debug, Default, Clone, Copy)]
pub struct EphemeralBackend;

impl PersistenceBackend for EphemeralBackend {
    fn name(&self) -> &'static str {
        "ephemeral"
    }

    fn supports_persistence(&self) -> bool {
        false
    }

    fn put(&self, _id: &PersistenceId, _record: &SecretRecord) -> Result<()> {
        Err(VaultError::UnsupportedPersistence)
    }

    fn get(&self, id: &PersistenceId) -> Result<SecretRecord> {
        Err(VaultError::NotFound(id.to_string()))
    }

    fn delete(&self, id: &PersistenceId) -> Result<()> {
        Err(VaultError::NotFound(id.to_string()))
    }

    fn list(&self) -> Result<Vec<PersistenceId>> {
        Ok(Vec::new())
    }
}
