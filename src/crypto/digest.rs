//! SHA-256 over caller-supplied bytes.  No secrets are involved.

use sha2::{Digest, Sha256};

/// Length of a SHA-256 digest in bytes.
pub const SHA256_LEN: usize = 32;

/// Hash `input` with SHA-256.
pub fn sha256(input: &[u8]) -> [u8; SHA256_LEN] {
    Sha256::digest(input).into()
}
