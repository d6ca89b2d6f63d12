//! Handle, attribute and persistence-id types for secrets held in a vault.
//!
//! Handles are opaque 64-bit values.  The only guarantees callers get are
//! equality and uniqueness while the referenced object is live; a handle
//! is never handed out twice within one registry.

use std::fmt;

use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::errors::{Result, VaultError};

/// Length of every fixed-size private key and of the AES-256 key.
pub const KEY_LEN: usize = 32;

/// Number of random bytes behind a persistence identifier.
const PERSISTENCE_ID_BYTES: usize = 16;

/// Opaque handle identifying a live vault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VaultHandle(u64);

impl VaultHandle {
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for VaultHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "vault#{}", self.0)
    }
}

/// Opaque handle identifying a secret inside its owning vault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SecretHandle(u64);

impl SecretHandle {
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SecretHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "secret#{}", self.0)
    }
}

/// What kind of material a secret holds, and therefore what it may be used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecretType {
    /// Arbitrary bytes of any length (salts, exported derivations).
    Buffer,
    /// AES-256-GCM key.
    AesKey,
    /// X25519 private scalar.
    Curve25519PrivateKey,
    /// NIST P-256 private scalar.
    P256PrivateKey,
    /// Opaque output of ECDH.  Usable as HKDF input or exported as raw bytes.
    Unknown,
}

impl SecretType {
    /// Canonical byte length for fixed-length types, `None` for variable ones.
    pub const fn canonical_length(self) -> Option<usize> {
        match self {
            SecretType::AesKey | SecretType::Curve25519PrivateKey | SecretType::P256PrivateKey => {
                Some(KEY_LEN)
            }
            SecretType::Buffer | SecretType::Unknown => None,
        }
    }

    /// Returns `true` for the elliptic-curve private key types.
    pub const fn is_private_key(self) -> bool {
        matches!(
            self,
            SecretType::Curve25519PrivateKey | SecretType::P256PrivateKey
        )
    }

    /// Short, stable name used in messages and the CLI.
    pub const fn name(self) -> &'static str {
        match self {
            SecretType::Buffer => "buffer",
            SecretType::AesKey => "aes",
            SecretType::Curve25519PrivateKey => "curve25519",
            SecretType::P256PrivateKey => "p256",
            SecretType::Unknown => "unknown",
        }
    }

    /// Parse the name produced by [`SecretType::name`].
    pub fn from_name(name: &str) -> Result<Self> {
        match name.to_lowercase().as_str() {
            "buffer" => Ok(SecretType::Buffer),
            "aes" | "aes256" | "aes-key" => Ok(SecretType::AesKey),
            "curve25519" | "x25519" => Ok(SecretType::Curve25519PrivateKey),
            "p256" | "p-256" => Ok(SecretType::P256PrivateKey),
            other => Err(VaultError::InvalidArgument(format!(
                "unknown secret type '{other}', supported: buffer, aes, curve25519, p256"
            ))),
        }
    }
}

impl fmt::Display for SecretType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<u32> for SecretType {
    type Error = VaultError;

    fn try_from(value: u32) -> Result<Self> {
        match value {
            0 => Ok(SecretType::Buffer),
            1 => Ok(SecretType::AesKey),
            2 => Ok(SecretType::Curve25519PrivateKey),
            3 => Ok(SecretType::P256PrivateKey),
            4 => Ok(SecretType::Unknown),
            other => Err(VaultError::InvalidArgument(format!(
                "unknown secret type code {other}"
            ))),
        }
    }
}

impl From<SecretType> for u32 {
    fn from(value: SecretType) -> Self {
        match value {
            SecretType::Buffer => 0,
            SecretType::AesKey => 1,
            SecretType::Curve25519PrivateKey => 2,
            SecretType::P256PrivateKey => 3,
            SecretType::Unknown => 4,
        }
    }
}

/// Whether a secret lives only in memory or also in the vault's backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecretPersistence {
    #[default]
    Ephemeral,
    Persistent,
}

impl SecretPersistence {
    pub const fn is_persistent(self) -> bool {
        matches!(self, SecretPersistence::Persistent)
    }
}

impl TryFrom<u32> for SecretPersistence {
    type Error = VaultError;

    fn try_from(value: u32) -> Result<Self> {
        match value {
            0 => Ok(SecretPersistence::Ephemeral),
            1 => Ok(SecretPersistence::Persistent),
            other => Err(VaultError::InvalidArgument(format!(
                "unknown persistence code {other}"
            ))),
        }
    }
}

impl From<SecretPersistence> for u32 {
    fn from(value: SecretPersistence) -> Self {
        match value {
            SecretPersistence::Ephemeral => 0,
            SecretPersistence::Persistent => 1,
        }
    }
}

/// Immutable attributes of a secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SecretAttributes {
    pub secret_type: SecretType,
    pub persistence: SecretPersistence,
    pub length: usize,
}

impl SecretAttributes {
    pub const fn new(secret_type: SecretType, persistence: SecretPersistence, length: usize) -> Self {
        Self {
            secret_type,
            persistence,
            length,
        }
    }

    /// Attributes for a key type at its canonical length.
    ///
    /// Falls back to `length = 0` for variable-length types; use
    /// [`SecretAttributes::buffer`] for those.
    pub const fn for_type(secret_type: SecretType, persistence: SecretPersistence) -> Self {
        let length = match secret_type.canonical_length() {
            Some(len) => len,
            None => 0,
        };
        Self::new(secret_type, persistence, length)
    }

    pub const fn buffer(length: usize, persistence: SecretPersistence) -> Self {
        Self::new(SecretType::Buffer, persistence, length)
    }

    pub const fn aes256(persistence: SecretPersistence) -> Self {
        Self::for_type(SecretType::AesKey, persistence)
    }

    pub const fn curve25519(persistence: SecretPersistence) -> Self {
        Self::for_type(SecretType::Curve25519PrivateKey, persistence)
    }

    pub const fn p256(persistence: SecretPersistence) -> Self {
        Self::for_type(SecretType::P256PrivateKey, persistence)
    }
}

/// Stable identifier of a persistent secret's durable record.
///
/// The identifier names the record's storage location: 32 lowercase hex
/// characters chosen at random when the secret is first persisted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PersistenceId(String);

impl PersistenceId {
    /// Pick a fresh random identifier.
    pub fn generate() -> Self {
        let mut bytes = [0u8; PERSISTENCE_ID_BYTES];
        rand::rng().fill_bytes(&mut bytes);
        Self(hex::encode(bytes))
    }

    /// Parse and validate an identifier supplied by a caller.
    ///
    /// Only the exact shape produced by [`PersistenceId::generate`] is
    /// accepted, so an identifier can never name a path outside the
    /// backend's storage.
    pub fn parse(raw: &str) -> Result<Self> {
        let valid = raw.len() == PERSISTENCE_ID_BYTES * 2
            && raw
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        if !valid {
            return Err(VaultError::InvalidArgument(format!(
                "'{raw}' is not a valid persistence id"
            )));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PersistenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
