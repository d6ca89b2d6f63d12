//! Cryptographic building blocks for KeyVault.
//!
//! Everything here is a thin wrapper over the RustCrypto / dalek
//! primitives; the vault decides which secret feeds which function.
//!
//! - SHA-256 hashing (`digest`)
//! - AES-256-GCM with counter nonces (`aead`)
//! - HKDF-SHA256 multi-output derivation (`kdf`)
//! - X25519 / P-256 keys and ECDH (`ecdh`)

pub mod aead;
pub mod digest;
pub mod ecdh;
pub mod kdf;

pub use aead::{decrypt, encrypt, TAG_LEN};
pub use digest::{sha256, SHA256_LEN};
