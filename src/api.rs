//! Flat call surface for binding layers.
//!
//! Every function takes the registry explicitly plus raw `u64` handles and
//! returns either a value or an `ExternError { code, message }`.  Panics
//! are caught and reported as `ERROR_INTERNAL`; nothing unwinds out of
//! this module.  Buffer-producing calls write into a caller buffer and
//! return the number of bytes written, failing with `BufferTooSmall`
//! (never truncating) when the buffer is short.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use crate::crypto::digest::SHA256_LEN;
use crate::errors::{Result, VaultError};
use crate::registry::VaultRegistry;
use crate::vault::{
    PersistenceId, SecretAttributes, SecretHandle, SecretPersistence, SecretType, Vault,
    VaultHandle,
};

/// Code reported when a call panicked.
pub const ERROR_INTERNAL: i32 = -1;

/// Error value handed across the boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternError {
    pub code: i32,
    pub message: String,
}

impl From<VaultError> for ExternError {
    fn from(err: VaultError) -> Self {
        Self {
            code: err.code(),
            message: err.to_string(),
        }
    }
}

impl fmt::Display for ExternError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for ExternError {}

pub type ExternResult<T> = std::result::Result<T, ExternError>;

/// C-layout secret attributes.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExternSecretAttributes {
    pub length: u32,
    pub secret_type: u32,
    pub persistence: u32,
}

impl TryFrom<ExternSecretAttributes> for SecretAttributes {
    type Error = VaultError;

    fn try_from(raw: ExternSecretAttributes) -> Result<Self> {
        let length = usize::try_from(raw.length)
            .map_err(|_| VaultError::InvalidArgument(format!("length {} too large", raw.length)))?;
        Ok(SecretAttributes::new(
            SecretType::try_from(raw.secret_type)?,
            SecretPersistence::try_from(raw.persistence)?,
            length,
        ))
    }
}

impl TryFrom<SecretAttributes> for ExternSecretAttributes {
    type Error = VaultError;

    fn try_from(attributes: SecretAttributes) -> Result<Self> {
        let length = u32::try_from(attributes.length).map_err(|_| {
            VaultError::InvalidArgument(format!("length {} exceeds u32", attributes.length))
        })?;
        Ok(Self {
            length,
            secret_type: attributes.secret_type.into(),
            persistence: attributes.persistence.into(),
        })
    }
}

fn call<T>(f: impl FnOnce() -> Result<T>) -> ExternResult<T> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result.map_err(ExternError::from),
        Err(_) => {
            tracing::error!("vault call panicked");
            Err(ExternError {
                code: ERROR_INTERNAL,
                message: "internal error".into(),
            })
        }
    }
}

fn with_vault<T>(
    registry: &VaultRegistry,
    vault: u64,
    f: impl FnOnce(&Vault) -> Result<T>,
) -> ExternResult<T> {
    call(|| {
        let vault = registry.get(VaultHandle::from_raw(vault))?;
        f(&vault)
    })
}

// ---------------------------------------------------------------------------
// Vault lifecycle
// ---------------------------------------------------------------------------

pub fn default_init(registry: &VaultRegistry) -> ExternResult<u64> {
    call(|| registry.default_init().map(VaultHandle::as_u64))
}

pub fn file_init(registry: &VaultRegistry, path: &str) -> ExternResult<u64> {
    call(|| registry.file_init(path).map(VaultHandle::as_u64))
}

pub fn deinit(registry: &VaultRegistry, vault: u64) -> ExternResult<()> {
    call(|| registry.deinit(VaultHandle::from_raw(vault)))
}

// ---------------------------------------------------------------------------
// Secret operations
// ---------------------------------------------------------------------------

pub fn sha256(
    registry: &VaultRegistry,
    vault: u64,
    input: &[u8],
    output: &mut [u8],
) -> ExternResult<usize> {
    with_vault(registry, vault, |v| {
        if output.len() < SHA256_LEN {
            return Err(VaultError::BufferTooSmall {
                required: SHA256_LEN,
                provided: output.len(),
            });
        }
        let digest = v.sha256(input)?;
        output[..SHA256_LEN].copy_from_slice(&digest);
        Ok(SHA256_LEN)
    })
}

pub fn secret_generate(
    registry: &VaultRegistry,
    vault: u64,
    attributes: ExternSecretAttributes,
) -> ExternResult<u64> {
    with_vault(registry, vault, |v| {
        let handle = v.secret_generate(attributes.try_into()?)?;
        Ok(handle.as_u64())
    })
}

pub fn secret_import(
    registry: &VaultRegistry,
    vault: u64,
    attributes: ExternSecretAttributes,
    input: &[u8],
) -> ExternResult<u64> {
    with_vault(registry, vault, |v| {
        let handle = v.secret_import(attributes.try_into()?, input)?;
        Ok(handle.as_u64())
    })
}

pub fn secret_export(
    registry: &VaultRegistry,
    vault: u64,
    secret: u64,
    output: &mut [u8],
) -> ExternResult<usize> {
    with_vault(registry, vault, |v| {
        v.secret_export(SecretHandle::from_raw(secret), output)
    })
}

pub fn secret_public_key_get(
    registry: &VaultRegistry,
    vault: u64,
    secret: u64,
    output: &mut [u8],
) -> ExternResult<usize> {
    with_vault(registry, vault, |v| {
        v.secret_public_key_get(SecretHandle::from_raw(secret), output)
    })
}

pub fn secret_attributes_get(
    registry: &VaultRegistry,
    vault: u64,
    secret: u64,
) -> ExternResult<ExternSecretAttributes> {
    with_vault(registry, vault, |v| {
        v.secret_attributes_get(SecretHandle::from_raw(secret))?
            .try_into()
    })
}

pub fn secret_destroy(registry: &VaultRegistry, vault: u64, secret: u64) -> ExternResult<()> {
    with_vault(registry, vault, |v| {
        v.secret_destroy(SecretHandle::from_raw(secret))
    })
}

pub fn ecdh(
    registry: &VaultRegistry,
    vault: u64,
    private_key: u64,
    peer_public_key: &[u8],
) -> ExternResult<u64> {
    with_vault(registry, vault, |v| {
        let handle = v.ecdh(SecretHandle::from_raw(private_key), peer_public_key)?;
        Ok(handle.as_u64())
    })
}

/// HKDF-SHA256; `input_key_material` may be empty.
pub fn hkdf_sha256(
    registry: &VaultRegistry,
    vault: u64,
    salt: u64,
    input_key_material: &[u64],
    outputs: &[ExternSecretAttributes],
) -> ExternResult<Vec<u64>> {
    with_vault(registry, vault, |v| {
        let ikm: Vec<SecretHandle> = input_key_material
            .iter()
            .copied()
            .map(SecretHandle::from_raw)
            .collect();
        let outputs = outputs
            .iter()
            .map(|raw| SecretAttributes::try_from(*raw))
            .collect::<Result<Vec<_>>>()?;
        let handles = v.hkdf_sha256(SecretHandle::from_raw(salt), &ikm, &outputs)?;
        Ok(handles.into_iter().map(SecretHandle::as_u64).collect())
    })
}

pub fn aead_aes_gcm_encrypt(
    registry: &VaultRegistry,
    vault: u64,
    key: u64,
    nonce: u16,
    additional_data: &[u8],
    plaintext: &[u8],
    output: &mut [u8],
) -> ExternResult<usize> {
    with_vault(registry, vault, |v| {
        v.aead_aes_gcm_encrypt(
            SecretHandle::from_raw(key),
            nonce,
            additional_data,
            plaintext,
            output,
        )
    })
}

pub fn aead_aes_gcm_decrypt(
    registry: &VaultRegistry,
    vault: u64,
    key: u64,
    nonce: u16,
    additional_data: &[u8],
    ciphertext_and_tag: &[u8],
    output: &mut [u8],
) -> ExternResult<usize> {
    with_vault(registry, vault, |v| {
        v.aead_aes_gcm_decrypt(
            SecretHandle::from_raw(key),
            nonce,
            additional_data,
            ciphertext_and_tag,
            output,
        )
    })
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

/// Write the persistence id (ASCII, no terminator) into `output`.
pub fn get_persistence_id(
    registry: &VaultRegistry,
    vault: u64,
    secret: u64,
    output: &mut [u8],
) -> ExternResult<usize> {
    with_vault(registry, vault, |v| {
        let id = v.get_persistence_id(SecretHandle::from_raw(secret))?;
        let bytes = id.as_str().as_bytes();
        if output.len() < bytes.len() {
            return Err(VaultError::BufferTooSmall {
                required: bytes.len(),
                provided: output.len(),
            });
        }
        output[..bytes.len()].copy_from_slice(bytes);
        Ok(bytes.len())
    })
}

pub fn get_persistent_secret(
    registry: &VaultRegistry,
    vault: u64,
    persistence_id: &str,
) -> ExternResult<u64> {
    with_vault(registry, vault, |v| {
        let id = PersistenceId::parse(persistence_id)?;
        let handle = v.get_persistent_secret(&id)?;
        Ok(handle.as_u64())
    })
}
