//! `Vault`: one secret table plus one persistence backend.
//!
//! Every secret operation goes through here.  Validation always happens
//! before anything is written (table or backend), and material only
//! leaves the table for the operations that are meant to release it:
//! export of buffers / AES keys / opaque ECDH output, and public keys.

use rand::RngCore;
use zeroize::Zeroizing;

use crate::backend::format::RecordHeader;
use crate::backend::{PersistenceBackend, SecretRecord};
use crate::crypto::{aead, digest, ecdh, kdf};
use crate::errors::{Result, VaultError};

use super::secret::{
    PersistenceId, SecretAttributes, SecretHandle, SecretPersistence, SecretType, VaultHandle,
};
use super::store::{SecretEntry, SecretStore};
use super::validate::{validate_attributes, validate_derived_output, validate_material};

/// An isolated vault instance.  Obtain one through `VaultRegistry`.
pub struct Vault {
    handle: VaultHandle,
    store: SecretStore,
    backend: Box<dyn PersistenceBackend>,
}

impl Vault {
    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    pub fn new(handle: VaultHandle, backend: Box<dyn PersistenceBackend>) -> Self {
        Self {
            handle,
            store: SecretStore::new(),
            backend,
        }
    }

    /// Scrub every secret and close the backend.
    ///
    /// A second call fails with `InvalidHandle`, as does every other
    /// operation once the vault is closed.
    pub fn close(&self) -> Result<usize> {
        let scrubbed = self.store.close()?;
        self.backend.close()?;
        tracing::debug!(vault = %self.handle, scrubbed, "closed vault");
        Ok(scrubbed)
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn handle(&self) -> VaultHandle {
        self.handle
    }

    /// Name of the backend ("ephemeral" or "file").
    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn supports_persistence(&self) -> bool {
        self.backend.supports_persistence()
    }

    /// Number of live secrets.
    pub fn secret_count(&self) -> usize {
        self.store.len()
    }

    pub fn is_open(&self) -> bool {
        self.store.is_open()
    }

    // ------------------------------------------------------------------
    // Hashing
    // ------------------------------------------------------------------

    pub fn sha256(&self, input: &[u8]) -> Result<[u8; digest::SHA256_LEN]> {
        self.store.ensure_open()?;
        Ok(digest::sha256(input))
    }

    // ------------------------------------------------------------------
    // Secret lifecycle
    // ------------------------------------------------------------------

    /// Generate a new random secret.
    pub fn secret_generate(&self, attributes: SecretAttributes) -> Result<SecretHandle> {
        validate_attributes(&attributes, self.supports_persistence())?;

        let material = match attributes.secret_type {
            SecretType::Buffer | SecretType::AesKey => {
                let mut bytes = Zeroizing::new(vec![0u8; attributes.length]);
                rand::rng().fill_bytes(&mut bytes);
                bytes
            }
            SecretType::Curve25519PrivateKey | SecretType::P256PrivateKey => {
                ecdh::generate_private_key(attributes.secret_type)?
            }
            SecretType::Unknown => {
                return Err(VaultError::InvalidArgument(
                    "secrets of type unknown cannot be generated".into(),
                ));
            }
        };

        self.insert_new(attributes, material)
    }

    /// Import caller-supplied material as a new secret.
    pub fn secret_import(&self, attributes: SecretAttributes, input: &[u8]) -> Result<SecretHandle> {
        validate_attributes(&attributes, self.supports_persistence())?;
        validate_material(&attributes, input)?;
        self.insert_new(attributes, Zeroizing::new(input.to_vec()))
    }

    /// Copy a secret's raw bytes into `output`, returning the length written.
    ///
    /// Elliptic-curve private keys are never released; use
    /// [`Vault::secret_public_key_get`] instead.
    pub fn secret_export(&self, secret: SecretHandle, output: &mut [u8]) -> Result<usize> {
        self.store.with_secret(secret, |entry| {
            if entry.attributes.secret_type.is_private_key() {
                return Err(VaultError::wrong_type(
                    "buffer, aes or unknown",
                    entry.attributes.secret_type,
                ));
            }
            copy_out(&entry.material, output)
        })
    }

    /// Write the public key of a private-key secret into `output`.
    pub fn secret_public_key_get(&self, secret: SecretHandle, output: &mut [u8]) -> Result<usize> {
        self.store.with_secret(secret, |entry| {
            let secret_type = entry.attributes.secret_type;
            if !secret_type.is_private_key() {
                return Err(VaultError::wrong_type("curve25519 or p256", secret_type));
            }
            let public_key = ecdh::public_key(secret_type, &entry.material)?;
            copy_out(&public_key, output)
        })
    }

    pub fn secret_attributes_get(&self, secret: SecretHandle) -> Result<SecretAttributes> {
        self.store.with_secret(secret, |entry| Ok(entry.attributes))
    }

    /// Destroy a secret, deleting its durable record if it has one.
    ///
    /// When the same record was loaded more than once, the record is only
    /// deleted with the last live handle that refers to it.  Destroying an
    /// unknown or already destroyed handle fails.
    pub fn secret_destroy(&self, secret: SecretHandle) -> Result<()> {
        self.store.remove_with(secret, |entry, record_shared| {
            let Some(id) = &entry.persistence_id else {
                return Ok(());
            };
            if record_shared {
                tracing::debug!(%id, "record still held by another handle, keeping it");
                return Ok(());
            }
            match self.backend.delete(id) {
                Ok(()) => Ok(()),
                Err(VaultError::NotFound(_)) => {
                    tracing::warn!(%id, "persistent record already gone while destroying secret");
                    Ok(())
                }
                Err(e) => Err(e),
            }
        })?;
        tracing::debug!(vault = %self.handle, %secret, "destroyed secret");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Key agreement and derivation
    // ------------------------------------------------------------------

    /// ECDH between a private-key secret and a peer public key.
    ///
    /// The shared secret is stored as a new ephemeral secret of type
    /// `Unknown`: it can feed HKDF or be exported, but never be used as
    /// an AES key directly.
    pub fn ecdh(&self, private_key: SecretHandle, peer_public_key: &[u8]) -> Result<SecretHandle> {
        let shared = self.store.with_secret(private_key, |entry| {
            let secret_type = entry.attributes.secret_type;
            if !secret_type.is_private_key() {
                return Err(VaultError::wrong_type("curve25519 or p256", secret_type));
            }
            ecdh::shared_secret(secret_type, &entry.material, peer_public_key)
        })?;

        let attributes =
            SecretAttributes::new(SecretType::Unknown, SecretPersistence::Ephemeral, shared.len());
        let handle = self.store.insert(SecretEntry::new(attributes, shared, None))?;
        tracing::debug!(vault = %self.handle, %private_key, shared = %handle, "ecdh");
        Ok(handle)
    }

    /// HKDF-SHA256 with `salt` as the extract key over the concatenated
    /// `input_key_material`, expanded into one secret per entry of `outputs`.
    ///
    /// Returned handles are in the same order as `outputs`.
    pub fn hkdf_sha256(
        &self,
        salt: SecretHandle,
        input_key_material: &[SecretHandle],
        outputs: &[SecretAttributes],
    ) -> Result<Vec<SecretHandle>> {
        if outputs.is_empty() {
            return Err(VaultError::InvalidArgument(
                "HKDF needs at least one output".into(),
            ));
        }
        for attributes in outputs {
            validate_derived_output(attributes, self.supports_persistence())?;
        }
        let lengths: Vec<usize> = outputs.iter().map(|a| a.length).collect();

        let mut inputs = Vec::with_capacity(1 + input_key_material.len());
        inputs.push(salt);
        inputs.extend_from_slice(input_key_material);

        let derived = self.store.with_secrets(&inputs, |entries| {
            let (salt, ikm) = entries
                .split_first()
                .ok_or_else(|| VaultError::InvalidArgument("missing HKDF salt".into()))?;
            let mut ikm_bytes = Zeroizing::new(Vec::new());
            for entry in ikm {
                ikm_bytes.extend_from_slice(&entry.material);
            }
            kdf::derive(&salt.material, &ikm_bytes, &lengths)
        })?;

        // Persist first, then publish all handles at once.
        let mut written = Vec::new();
        let mut entries = Vec::with_capacity(outputs.len());
        for (attributes, material) in outputs.iter().zip(derived) {
            let persistence_id = if attributes.persistence.is_persistent() {
                let id = PersistenceId::generate();
                if let Err(e) = self.backend.put(&id, &SecretRecord::new(*attributes, &material)) {
                    self.discard_records(&written);
                    return Err(e);
                }
                written.push(id.clone());
                Some(id)
            } else {
                None
            };
            entries.push(SecretEntry::new(*attributes, material, persistence_id));
        }

        match self.store.insert_all(entries) {
            Ok(handles) => {
                tracing::debug!(vault = %self.handle, outputs = handles.len(), "hkdf_sha256");
                Ok(handles)
            }
            Err(e) => {
                self.discard_records(&written);
                Err(e)
            }
        }
    }

    // ------------------------------------------------------------------
    // AEAD
    // ------------------------------------------------------------------

    /// AES-256-GCM encrypt into `output` (ciphertext followed by tag).
    pub fn aead_aes_gcm_encrypt(
        &self,
        key: SecretHandle,
        nonce: u16,
        additional_data: &[u8],
        plaintext: &[u8],
        output: &mut [u8],
    ) -> Result<usize> {
        self.store.with_secret(key, |entry| {
            require_aes_key(entry)?;
            aead::encrypt_into(&entry.material, nonce, additional_data, plaintext, output)
        })
    }

    /// AES-256-GCM decrypt `ciphertext_and_tag` into `output`.
    pub fn aead_aes_gcm_decrypt(
        &self,
        key: SecretHandle,
        nonce: u16,
        additional_data: &[u8],
        ciphertext_and_tag: &[u8],
        output: &mut [u8],
    ) -> Result<usize> {
        self.store.with_secret(key, |entry| {
            require_aes_key(entry)?;
            aead::decrypt_into(
                &entry.material,
                nonce,
                additional_data,
                ciphertext_and_tag,
                output,
            )
        })
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Persistence id of a persistent secret.
    pub fn get_persistence_id(&self, secret: SecretHandle) -> Result<PersistenceId> {
        self.store.with_secret(secret, |entry| {
            entry
                .persistence_id
                .clone()
                .ok_or(VaultError::NotPersistent(secret.as_u64()))
        })
    }

    /// Load the secret stored under `id` into a fresh handle.
    pub fn get_persistent_secret(&self, id: &PersistenceId) -> Result<SecretHandle> {
        self.store.ensure_open()?;
        let record = self.backend.get(id)?;
        let attributes = *record.attributes();
        check_record(id, &attributes, &record.material)?;

        let handle = self
            .store
            .insert(SecretEntry::new(attributes, record.material, Some(id.clone())))?;
        tracing::debug!(vault = %self.handle, %id, secret = %handle, "loaded persistent secret");
        Ok(handle)
    }

    /// Header of the record stored under `id`, without creating a handle.
    pub fn persistent_record_header(&self, id: &PersistenceId) -> Result<RecordHeader> {
        self.store.ensure_open()?;
        let record = self.backend.get(id)?;
        check_record(id, record.attributes(), &record.material)?;
        Ok(record.header)
    }

    /// Identifiers of every record held by the backend.
    pub fn persistent_ids(&self) -> Result<Vec<PersistenceId>> {
        self.store.ensure_open()?;
        self.backend.list()
    }

    // ------------------------------------------------------------------
    // Internal helpers
    // ------------------------------------------------------------------

    /// Persist (if requested) and insert a validated secret.
    fn insert_new(
        &self,
        attributes: SecretAttributes,
        material: Zeroizing<Vec<u8>>,
    ) -> Result<SecretHandle> {
        self.store.ensure_open()?;

        let persistence_id = if attributes.persistence.is_persistent() {
            let id = PersistenceId::generate();
            self.backend
                .put(&id, &SecretRecord::new(attributes, &material))?;
            Some(id)
        } else {
            None
        };

        match self
            .store
            .insert(SecretEntry::new(attributes, material, persistence_id.clone()))
        {
            Ok(handle) => {
                tracing::debug!(
                    vault = %self.handle,
                    secret = %handle,
                    secret_type = %attributes.secret_type,
                    persistent = attributes.persistence.is_persistent(),
                    "created secret"
                );
                Ok(handle)
            }
            Err(e) => {
                if let Some(id) = persistence_id {
                    self.discard_records(&[id]);
                }
                Err(e)
            }
        }
    }

    /// Best-effort rollback of records written by a failed operation.
    fn discard_records(&self, ids: &[PersistenceId]) {
        for id in ids {
            if let Err(e) = self.backend.delete(id) {
                tracing::warn!(%id, error = %e, "failed to roll back persistent record");
            }
        }
    }
}

impl std::fmt::Debug for Vault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vault")
            .field("handle", &self.handle)
            .field("backend", &self.backend.name())
            .field("secrets", &self.store.len())
            .finish()
    }
}

fn copy_out(source: &[u8], output: &mut [u8]) -> Result<usize> {
    if output.len() < source.len() {
        return Err(VaultError::BufferTooSmall {
            required: source.len(),
            provided: output.len(),
        });
    }
    output[..source.len()].copy_from_slice(source);
    Ok(source.len())
}

fn require_aes_key(entry: &SecretEntry) -> Result<()> {
    match entry.attributes.secret_type {
        SecretType::AesKey => Ok(()),
        other => Err(VaultError::wrong_type("aes", other)),
    }
}

/// A record read back from disk must still satisfy the creation rules.
fn check_record(id: &PersistenceId, attributes: &SecretAttributes, material: &[u8]) -> Result<()> {
    if !attributes.persistence.is_persistent() {
        return Err(VaultError::InvalidRecordFormat(format!(
            "{id}: record is not marked persistent"
        )));
    }
    validate_attributes(attributes, true)
        .and_then(|()| validate_material(attributes, material))
        .map_err(|e| VaultError::InvalidRecordFormat(format!("{id}: {e}")))
}
