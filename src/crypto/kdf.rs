//! HKDF-SHA256 (RFC 5869) producing several outputs from one expansion.
//!
//! The salt is used as the HMAC key for the extract step, the input key
//! material is the concatenation of every IKM secret, and `info` is empty.
//! One expand call produces the sum of the requested lengths, which is
//! then split in request order.  That order is part of the contract:
//! protocols rely on output 0 and output 1 being distinct, stable keys.

use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::errors::{Result, VaultError};

/// Largest total output a single HKDF-SHA256 expand may produce (255 * 32).
pub const MAX_OUTPUT_LEN: usize = 255 * 32;

/// Derive one output per entry of `lengths`.
pub fn derive(salt: &[u8], ikm: &[u8], lengths: &[usize]) -> Result<Vec<Zeroizing<Vec<u8>>>> {
    let total = lengths
        .iter()
        .try_fold(0usize, |acc, len| acc.checked_add(*len))
        .unwrap_or(usize::MAX);
    if total > MAX_OUTPUT_LEN {
        return Err(VaultError::TooManyOutputs {
            requested: total,
            max: MAX_OUTPUT_LEN,
        });
    }

    let hk = Hkdf::<Sha256>::new(Some(salt), ikm);

    let mut okm = Zeroizing::new(vec![0u8; total]);
    hk.expand(&[], &mut okm)
        .map_err(|e| VaultError::KeyDerivationFailed(format!("HKDF expand failed: {e}")))?;

    let mut outputs = Vec::with_capacity(lengths.len());
    let mut offset = 0;
    for len in lengths {
        outputs.push(Zeroizing::new(okm[offset..offset + len].to_vec()));
        offset += len;
    }
    Ok(outputs)
}
