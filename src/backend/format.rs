//! Binary record format for one persistent secret.
//!
//! A `.secret` file has this layout:
//!
//! ```text
//! [KVSR: 4 bytes][version: 1 byte][header_len: 4 bytes LE][header JSON][material][SHA-256: 32 bytes]
//! ```
//!
//! - **Magic** (`KVSR`): identifies the file as a KeyVault secret record.
//! - **Version**: format version (currently `1`).
//! - **Header length**: little-endian u32 telling us where the header
//!   JSON ends and the raw material begins.
//! - **Header JSON**: serialized `RecordHeader` (attributes + timestamp).
//! - **Material**: the raw secret bytes, exactly `header.attributes.length`.
//! - **SHA-256**: checksum over header + material, catching torn or
//!   corrupted files.  It is not a MAC; the record file itself is the
//!   secret and is protected by filesystem permissions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::crypto::digest::{sha256, SHA256_LEN};
use crate::errors::{Result, VaultError};
use crate::vault::secret::SecretAttributes;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Magic bytes at the start of every record file.
const MAGIC: &[u8; 4] = b"KVSR";

/// Current binary format version.
pub const CURRENT_VERSION: u8 = 1;

/// Fixed-size prefix: 4 (magic) + 1 (version) + 4 (header_len).
const PREFIX_LEN: usize = 9;

// ---------------------------------------------------------------------------
// Record types
// ---------------------------------------------------------------------------

/// Metadata stored at the beginning of a record file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordHeader {
    /// Format version.
    pub version: u8,

    /// Attributes of the stored secret.
    pub attributes: SecretAttributes,

    /// When the secret was first persisted.
    pub created_at: DateTime<Utc>,
}

/// A decoded record: header plus the secret material.
pub struct SecretRecord {
    pub header: RecordHeader,
    pub material: Zeroizing<Vec<u8>>,
}

impl SecretRecord {
    /// Build a record for a secret being persisted now.
    pub fn new(attributes: SecretAttributes, material: &[u8]) -> Self {
        Self {
            header: RecordHeader {
                version: CURRENT_VERSION,
                attributes,
                created_at: Utc::now(),
            },
            material: Zeroizing::new(material.to_vec()),
        }
    }

    pub fn attributes(&self) -> &SecretAttributes {
        &self.header.attributes
    }
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// Encode a record into its on-disk bytes.
///
/// The returned buffer contains the secret material, so it is zeroized
/// on drop.
pub fn encode(record: &SecretRecord) -> Result<Zeroizing<Vec<u8>>> {
    let header_bytes = serde_json::to_vec(&record.header)
        .map_err(|e| VaultError::SerializationError(format!("record header: {e}")))?;

    let header_len = u32::try_from(header_bytes.len()).map_err(|_| {
        VaultError::SerializationError(format!(
            "header length {} exceeds u32::MAX",
            header_bytes.len()
        ))
    })?;

    let total = PREFIX_LEN + header_bytes.len() + record.material.len() + SHA256_LEN;
    let mut buf = Zeroizing::new(Vec::with_capacity(total));

    buf.extend_from_slice(MAGIC); // 4 bytes
    buf.push(CURRENT_VERSION); // 1 byte
    buf.extend_from_slice(&header_len.to_le_bytes()); // 4 bytes LE
    buf.extend_from_slice(&header_bytes); // header JSON
    buf.extend_from_slice(&record.material); // raw material

    let checksum = sha256(&buf[PREFIX_LEN..]);
    buf.extend_from_slice(&checksum); // 32 bytes

    Ok(buf)
}

/// Decode and verify a record read from disk.
pub fn decode(data: &[u8]) -> Result<SecretRecord> {
    // Minimum size: prefix + checksum.
    if data.len() < PREFIX_LEN + SHA256_LEN {
        return Err(VaultError::InvalidRecordFormat(
            "file too small to be a valid record".into(),
        ));
    }

    // --- Parse the fixed-size prefix ---

    if &data[0..4] != MAGIC {
        return Err(VaultError::InvalidRecordFormat(
            "missing KVSR magic bytes".into(),
        ));
    }

    let version = data[4];
    if version != CURRENT_VERSION {
        return Err(VaultError::InvalidRecordFormat(format!(
            "unsupported version {version}, expected {CURRENT_VERSION}"
        )));
    }

    let header_len_u32 = u32::from_le_bytes(
        data[5..9]
            .try_into()
            .map_err(|_| VaultError::InvalidRecordFormat("bad header length".into()))?,
    );
    let header_len = usize::try_from(header_len_u32).map_err(|_| {
        VaultError::InvalidRecordFormat(format!(
            "header length {header_len_u32} exceeds platform address space"
        ))
    })?;

    let header_end = PREFIX_LEN + header_len;
    if header_end + SHA256_LEN > data.len() {
        return Err(VaultError::InvalidRecordFormat(
            "header length exceeds file size".into(),
        ));
    }

    // --- Verify the checksum before trusting anything else ---

    let body_end = data.len() - SHA256_LEN;
    let expected = sha256(&data[PREFIX_LEN..body_end]);
    if !bool::from(expected[..].ct_eq(&data[body_end..])) {
        return Err(VaultError::InvalidRecordFormat(
            "checksum mismatch, record is corrupted".into(),
        ));
    }

    let header: RecordHeader = serde_json::from_slice(&data[PREFIX_LEN..header_end])
        .map_err(|e| VaultError::InvalidRecordFormat(format!("header JSON: {e}")))?;

    let material = &data[header_end..body_end];
    if material.len() != header.attributes.length {
        return Err(VaultError::InvalidRecordFormat(format!(
            "header declares {} bytes of material, found {}",
            header.attributes.length,
            material.len()
        )));
    }

    Ok(SecretRecord {
        header,
        material: Zeroizing::new(material.to_vec()),
    })
}
