//! Process-wide table of live vaults.
//!
//! A `VaultRegistry` is created explicitly and torn down explicitly (or on
//! drop).  Vault handles come from a process-wide counter, as do secret
//! handles (see `vault::store`), so two registries in one process never
//! hand out the same value and a stale or foreign handle always fails
//! with `InvalidHandle` instead of reaching the wrong secret.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::backend::{EphemeralBackend, FileBackend, PersistenceBackend};
use crate::errors::{Result, VaultError};
use crate::vault::{Vault, VaultHandle};

static NEXT_VAULT_HANDLE: AtomicU64 = AtomicU64::new(1);

/// Which backend a new vault sits on.
#[derive(Debug, Clone)]
pub enum VaultKind {
    /// In-memory only; persistent secrets are refused.
    Default,
    /// Persistent secrets are stored as record files under `path`.
    File { path: PathBuf },
}

impl VaultKind {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        VaultKind::File { path: path.into() }
    }
}

pub struct VaultRegistry {
    vaults: RwLock<HashMap<VaultHandle, Arc<Vault>>>,
}

impl VaultRegistry {
    pub fn new() -> Self {
        Self {
            vaults: RwLock::new(HashMap::new()),
        }
    }

    /// Create a vault of the given kind and return its handle.
    pub fn init(&self, kind: VaultKind) -> Result<VaultHandle> {
        let backend: Box<dyn PersistenceBackend> = match kind {
            VaultKind::Default => Box::new(EphemeralBackend),
            VaultKind::File { path } => Box::new(FileBackend::open(&path)?),
        };

        let handle = VaultHandle::from_raw(NEXT_VAULT_HANDLE.fetch_add(1, Ordering::Relaxed));
        let vault = Vault::new(handle, backend);
        let backend_name = vault.backend_name();
        self.vaults.write().insert(handle, Arc::new(vault));

        tracing::info!(vault = %handle, backend = backend_name, "initialized vault");
        Ok(handle)
    }

    /// Create an in-memory vault.
    pub fn default_init(&self) -> Result<VaultHandle> {
        self.init(VaultKind::Default)
    }

    /// Create a vault whose persistent secrets live under `path`.
    pub fn file_init(&self, path: impl AsRef<Path>) -> Result<VaultHandle> {
        self.init(VaultKind::file(path.as_ref()))
    }

    /// Look up a live vault.
    pub fn get(&self, handle: VaultHandle) -> Result<Arc<Vault>> {
        self.vaults
            .read()
            .get(&handle)
            .cloned()
            .ok_or_else(|| VaultError::InvalidHandle(format!("{handle} is unknown or closed")))
    }

    /// Close a vault: all its secrets are scrubbed and its handle retired.
    ///
    /// Persistent records stay on disk.
    pub fn deinit(&self, handle: VaultHandle) -> Result<()> {
        let vault = self
            .vaults
            .write()
            .remove(&handle)
            .ok_or_else(|| VaultError::InvalidHandle(format!("{handle} is unknown or closed")))?;
        let scrubbed = vault.close()?;
        tracing::info!(vault = %handle, scrubbed, "deinitialized vault");
        Ok(())
    }

    /// Number of live vaults.
    pub fn len(&self) -> usize {
        self.vaults.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Close every live vault.  Returns how many were closed.
    pub fn shutdown(&self) -> usize {
        let drained: Vec<_> = self.vaults.write().drain().collect();
        for (handle, vault) in &drained {
            if let Err(e) = vault.close() {
                tracing::warn!(vault = %handle, error = %e, "failed to close vault during shutdown");
            }
        }
        drained.len()
    }
}

impl Default for VaultRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for VaultRegistry {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vault::{SecretAttributes, SecretPersistence};

    #[test]
    fn handles_are_unique_and_not_reused() {
        let registry = VaultRegistry::new();
        let a = registry.default_init().unwrap();
        registry.deinit(a).unwrap();
        let b = registry.default_init().unwrap();
        assert_ne!(a, b);
        assert!(registry.get(a).is_err());
        assert!(registry.get(b).is_ok());
    }

    #[test]
    fn registries_share_one_handle_space() {
        let first = VaultRegistry::new();
        let second = VaultRegistry::new();
        let va = first.default_init().unwrap();
        let vb = second.default_init().unwrap();
        assert_ne!(va, vb);
        assert!(second.get(va).is_err());

        let attrs = SecretAttributes::aes256(SecretPersistence::Ephemeral);
        let sa = first.get(va).unwrap().secret_generate(attrs).unwrap();
        let sb = second.get(vb).unwrap().secret_generate(attrs).unwrap();
        assert_ne!(sa, sb);
    }

    #[test]
    fn second_deinit_fails() {
        let registry = VaultRegistry::new();
        let v = registry.default_init().unwrap();
        registry.deinit(v).unwrap();
        assert!(matches!(
            registry.deinit(v),
            Err(VaultError::InvalidHandle(_))
        ));
    }

    #[test]
    fn secret_handles_do_not_cross_vaults() {
        let registry = VaultRegistry::new();
        let a = registry.get(registry.default_init().unwrap()).unwrap();
        let b = registry.get(registry.default_init().unwrap()).unwrap();

        let secret = a
            .secret_generate(SecretAttributes::aes256(SecretPersistence::Ephemeral))
            .unwrap();
        assert!(a.secret_attributes_get(secret).is_ok());
        assert!(matches!(
            b.secret_attributes_get(secret),
            Err(VaultError::InvalidHandle(_))
        ));
    }

    #[test]
    fn vault_held_across_deinit_is_closed() {
        let registry = VaultRegistry::new();
        let handle = registry.default_init().unwrap();
        let vault = registry.get(handle).unwrap();
        registry.deinit(handle).unwrap();
        assert!(!vault.is_open());
        assert!(vault.sha256(b"").is_err());
    }

    #[test]
    fn shutdown_closes_everything() {
        let registry = VaultRegistry::new();
        registry.default_init().unwrap();
        registry.default_init().unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.shutdown(), 2);
        assert!(registry.is_empty());
    }

    #[test]
    fn file_init_rejects_regular_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("plain");
        std::fs::write(&path, b"x").unwrap();
        let registry = VaultRegistry::new();
        assert!(matches!(
            registry.file_init(&path),
            Err(VaultError::InitError(_))
        ));
        assert!(registry.is_empty());
    }
}
