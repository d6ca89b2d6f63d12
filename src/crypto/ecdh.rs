//! Elliptic-curve private keys: generation, validation, public keys and ECDH.
//!
//! Two curves are supported:
//! - **X25519**: any 32 bytes form a valid (clamped) scalar.  Public keys
//!   are 32 bytes.
//! - **P-256**: the scalar must lie in `[1, n)`.  Public keys are SEC1
//!   points, 65 bytes uncompressed (33 compressed is accepted for peers).
//!
//! Shared secrets are the raw 32-byte x-coordinate / Montgomery output.
//! They are not uniformly random and must go through HKDF before use.

use p256::elliptic_curve::sec1::ToEncodedPoint;
use rand::RngCore;
use zeroize::{Zeroize, Zeroizing};

use crate::errors::{Result, VaultError};
use crate::vault::secret::{SecretType, KEY_LEN};

/// Length of an X25519 public key.
pub const X25519_PUBLIC_KEY_LEN: usize = 32;

/// Length of an uncompressed SEC1 P-256 public key.
pub const P256_PUBLIC_KEY_LEN: usize = 65;

/// Length of a compressed SEC1 P-256 public key.
pub const P256_COMPRESSED_PUBLIC_KEY_LEN: usize = 33;

/// Length of every shared secret produced by [`shared_secret`].
pub const SHARED_SECRET_LEN: usize = 32;

/// Public key length produced for a private key type.
pub fn public_key_len(secret_type: SecretType) -> Result<usize> {
    match secret_type {
        SecretType::Curve25519PrivateKey => Ok(X25519_PUBLIC_KEY_LEN),
        SecretType::P256PrivateKey => Ok(P256_PUBLIC_KEY_LEN),
        other => Err(VaultError::wrong_type("curve25519 or p256", other)),
    }
}

/// Generate a fresh private scalar for `secret_type`.
///
/// P-256 candidates outside `[1, n)` are discarded and redrawn; the chance
/// of a single redraw is below 2^-32.
pub fn generate_private_key(secret_type: SecretType) -> Result<Zeroizing<Vec<u8>>> {
    let mut candidate = Zeroizing::new(vec![0u8; KEY_LEN]);
    match secret_type {
        SecretType::Curve25519PrivateKey => {
            rand::rng().fill_bytes(&mut candidate);
            Ok(candidate)
        }
        SecretType::P256PrivateKey => loop {
            rand::rng().fill_bytes(&mut candidate);
            if p256::SecretKey::from_slice(&candidate).is_ok() {
                return Ok(candidate);
            }
            tracing::trace!("discarded out-of-range P-256 scalar candidate");
        },
        other => Err(VaultError::wrong_type("curve25519 or p256", other)),
    }
}

/// Check that `bytes` is a usable private scalar for `secret_type`.
pub fn validate_private_key(secret_type: SecretType, bytes: &[u8]) -> Result<()> {
    if bytes.len() != KEY_LEN {
        return Err(VaultError::InvalidKeyMaterial(format!(
            "{secret_type} private key must be {KEY_LEN} bytes, got {}",
            bytes.len()
        )));
    }
    match secret_type {
        SecretType::Curve25519PrivateKey => Ok(()),
        SecretType::P256PrivateKey => p256::SecretKey::from_slice(bytes)
            .map(|_| ())
            .map_err(|_| {
                VaultError::InvalidKeyMaterial(
                    "P-256 scalar is zero or not below the group order".into(),
                )
            }),
        other => Err(VaultError::wrong_type("curve25519 or p256", other)),
    }
}

/// Derive the public key that belongs to `private`.
pub fn public_key(secret_type: SecretType, private: &[u8]) -> Result<Vec<u8>> {
    match secret_type {
        SecretType::Curve25519PrivateKey => {
            let secret = x25519_secret(private)?;
            Ok(x25519_dalek::PublicKey::from(&secret).as_bytes().to_vec())
        }
        SecretType::P256PrivateKey => {
            let secret = p256_secret(private)?;
            Ok(secret
                .public_key()
                .to_encoded_point(false)
                .as_bytes()
                .to_vec())
        }
        other => Err(VaultError::wrong_type("curve25519 or p256", other)),
    }
}

/// Perform ECDH between `private` and the peer's encoded public key.
///
/// Peer keys of the wrong length for the curve, points not on the curve,
/// the identity and (for X25519) low-order points are all rejected with
/// `InvalidPeerKey`.
pub fn shared_secret(
    secret_type: SecretType,
    private: &[u8],
    peer_public: &[u8],
) -> Result<Zeroizing<Vec<u8>>> {
    match secret_type {
        SecretType::Curve25519PrivateKey => {
            let peer: [u8; X25519_PUBLIC_KEY_LEN] = peer_public.try_into().map_err(|_| {
                VaultError::InvalidPeerKey(format!(
                    "X25519 public key must be {X25519_PUBLIC_KEY_LEN} bytes, got {}",
                    peer_public.len()
                ))
            })?;
            let secret = x25519_secret(private)?;
            let shared = secret.diffie_hellman(&x25519_dalek::PublicKey::from(peer));
            if !shared.was_contributory() {
                return Err(VaultError::InvalidPeerKey(
                    "X25519 public key is a low-order point".into(),
                ));
            }
            Ok(Zeroizing::new(shared.as_bytes().to_vec()))
        }
        SecretType::P256PrivateKey => {
            if peer_public.len() != P256_PUBLIC_KEY_LEN
                && peer_public.len() != P256_COMPRESSED_PUBLIC_KEY_LEN
            {
                return Err(VaultError::InvalidPeerKey(format!(
                    "P-256 public key must be {P256_PUBLIC_KEY_LEN} or {P256_COMPRESSED_PUBLIC_KEY_LEN} bytes, got {}",
                    peer_public.len()
                )));
            }
            let peer = p256::PublicKey::from_sec1_bytes(peer_public).map_err(|_| {
                VaultError::InvalidPeerKey("P-256 public key is not a valid curve point".into())
            })?;
            let secret = p256_secret(private)?;
            let shared = p256::ecdh::diffie_hellman(secret.to_nonzero_scalar(), peer.as_affine());
            Ok(Zeroizing::new(shared.raw_secret_bytes().to_vec()))
        }
        other => Err(VaultError::wrong_type("curve25519 or p256", other)),
    }
}

fn x25519_secret(private: &[u8]) -> Result<x25519_dalek::StaticSecret> {
    let mut bytes: [u8; KEY_LEN] = private.try_into().map_err(|_| {
        VaultError::InvalidKeyMaterial("X25519 private key must be 32 bytes".into())
    })?;
    let secret = x25519_dalek::StaticSecret::from(bytes);
    bytes.zeroize();
    Ok(secret)
}

fn p256_secret(private: &[u8]) -> Result<p256::SecretKey> {
    p256::SecretKey::from_slice(private)
        .map_err(|_| VaultError::InvalidKeyMaterial("invalid P-256 scalar".into()))
}
