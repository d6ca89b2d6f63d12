//! AES-256-GCM authenticated encryption with counter nonces.
//!
//! Callers pass a 16-bit counter instead of a full nonce.  The counter is
//! expanded into the 96-bit GCM nonce as ten zero bytes followed by the
//! big-endian counter.  Nonce reuse under one key is the caller's problem;
//! nothing here tracks which counters have been used.
//!
//! Layout of the encrypted output:
//!   [ ciphertext (same length as plaintext) | 16-byte auth tag ]

use aes_gcm::aead::{AeadInPlace, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce, Tag};
use zeroize::Zeroize;

use crate::errors::{Result, VaultError};

/// Size of the AES-256-GCM nonce in bytes.
pub const NONCE_LEN: usize = 12;

/// Size of the authentication tag appended to every ciphertext.
pub const TAG_LEN: usize = 16;

/// Expand a 16-bit counter into a 96-bit GCM nonce.
pub fn expand_nonce(counter: u16) -> [u8; NONCE_LEN] {
    let mut nonce = [0u8; NONCE_LEN];
    nonce[NONCE_LEN - 2..].copy_from_slice(&counter.to_be_bytes());
    nonce
}

fn cipher(key: &[u8]) -> Result<Aes256Gcm> {
    Aes256Gcm::new_from_slice(key)
        .map_err(|e| VaultError::EncryptionFailed(format!("invalid key length: {e}")))
}

/// Encrypt `plaintext` into `output`, returning the number of bytes written.
///
/// `output` must hold at least `plaintext.len() + TAG_LEN` bytes.
pub fn encrypt_into(
    key: &[u8],
    counter: u16,
    aad: &[u8],
    plaintext: &[u8],
    output: &mut [u8],
) -> Result<usize> {
    let required = plaintext.len() + TAG_LEN;
    if output.len() < required {
        return Err(VaultError::BufferTooSmall {
            required,
            provided: output.len(),
        });
    }

    let cipher = cipher(key)?;
    let nonce = expand_nonce(counter);

    let (body, rest) = output.split_at_mut(plaintext.len());
    body.copy_from_slice(plaintext);
    let tag = cipher
        .encrypt_in_place_detached(Nonce::from_slice(&nonce), aad, body)
        .map_err(|e| {
            body.zeroize();
            VaultError::EncryptionFailed(format!("encryption error: {e}"))
        })?;
    rest[..TAG_LEN].copy_from_slice(&tag);

    Ok(required)
}

/// Decrypt `ciphertext_and_tag` into `output`, returning the plaintext length.
///
/// On tag mismatch nothing of the plaintext survives in `output`.
pub fn decrypt_into(
    key: &[u8],
    counter: u16,
    aad: &[u8],
    ciphertext_and_tag: &[u8],
    output: &mut [u8],
) -> Result<usize> {
    if ciphertext_and_tag.len() < TAG_LEN {
        return Err(VaultError::InvalidArgument(format!(
            "ciphertext must be at least {TAG_LEN} bytes, got {}",
            ciphertext_and_tag.len()
        )));
    }

    let (ciphertext, tag) = ciphertext_and_tag.split_at(ciphertext_and_tag.len() - TAG_LEN);
    if output.len() < ciphertext.len() {
        return Err(VaultError::BufferTooSmall {
            required: ciphertext.len(),
            provided: output.len(),
        });
    }

    let cipher = cipher(key)?;
    let nonce = expand_nonce(counter);

    let body = &mut output[..ciphertext.len()];
    body.copy_from_slice(ciphertext);

    // The tag comparison inside aes-gcm is constant-time.
    if cipher
        .decrypt_in_place_detached(Nonce::from_slice(&nonce), aad, body, Tag::from_slice(tag))
        .is_err()
    {
        body.zeroize();
        return Err(VaultError::AuthenticationFailed);
    }

    Ok(ciphertext.len())
}

/// Allocating form of [`encrypt_into`].
pub fn encrypt(key: &[u8], counter: u16, aad: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
    let mut output = vec![0u8; plaintext.len() + TAG_LEN];
    encrypt_into(key, counter, aad, plaintext, &mut output)?;
    Ok(output)
}

/// Allocating form of [`decrypt_into`].
pub fn decrypt(key: &[u8], counter: u16, aad: &[u8], ciphertext_and_tag: &[u8]) -> Result<Vec<u8>> {
    let mut output = vec![0u8; ciphertext_and_tag.len().saturating_sub(TAG_LEN)];
    decrypt_into(key, counter, aad, ciphertext_and_tag, &mut output)?;
    Ok(output)
}
