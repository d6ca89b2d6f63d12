//! Attribute validation shared by every path that creates a secret.
//!
//! Generate, import, HKDF outputs and reloads from the backend all go
//! through these checks before anything touches the secret table, so a
//! rejected request never leaves a partial secret behind.

use crate::crypto::ecdh;
use crate::errors::{Result, VaultError};

use super::secret::{SecretAttributes, SecretType};

/// Largest buffer secret a vault accepts (1 MiB).  Larger requests fail
/// with `InvalidArgument` before any memory is reserved for them.
pub const MAX_BUFFER_LEN: usize = 1 << 20;

/// Validate attributes for a secret about to be created.
///
/// `persistence_supported` is the owning backend's capability.
pub fn validate_attributes(attributes: &SecretAttributes, persistence_supported: bool) -> Result<()> {
    if attributes.secret_type == SecretType::Unknown {
        return Err(VaultError::InvalidArgument(
            "secrets of type unknown can only be produced by ECDH".into(),
        ));
    }

    if let Some(canonical) = attributes.secret_type.canonical_length() {
        if attributes.length != canonical {
            return Err(VaultError::InvalidArgument(format!(
                "{} secrets must be {canonical} bytes, got {}",
                attributes.secret_type, attributes.length
            )));
        }
    }

    if attributes.length > MAX_BUFFER_LEN {
        return Err(VaultError::InvalidArgument(format!(
            "secrets are limited to {MAX_BUFFER_LEN} bytes, got {}",
            attributes.length
        )));
    }

    if attributes.persistence.is_persistent() && !persistence_supported {
        return Err(VaultError::UnsupportedPersistence);
    }

    Ok(())
}

/// Validate caller-supplied material against already-validated attributes.
pub fn validate_material(attributes: &SecretAttributes, material: &[u8]) -> Result<()> {
    if material.len() != attributes.length {
        return Err(VaultError::InvalidArgument(format!(
            "attributes declare {} bytes but {} were supplied",
            attributes.length,
            material.len()
        )));
    }

    if attributes.secret_type.is_private_key() {
        ecdh::validate_private_key(attributes.secret_type, material)?;
    }

    Ok(())
}

/// Output types HKDF may produce.
pub fn validate_derived_output(attributes: &SecretAttributes, persistence_supported: bool) -> Result<()> {
    match attributes.secret_type {
        SecretType::Buffer | SecretType::AesKey => {
            validate_attributes(attributes, persistence_supported)
        }
        other => Err(VaultError::InvalidArgument(format!(
            "HKDF cannot produce secrets of type {other}"
        ))),
    }
}
