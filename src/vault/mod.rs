//! Vault module: handle-addressed secret storage.
//!
//! This module provides:
//! - Handle, type, persistence and attribute definitions (`secret`)
//! - Creation-time and load-time checks on attributes and material (`validate`)
//! - The locked handle table that owns secret material (`store`)
//! - `Vault`, the operation surface over a table and a backend (`operations`)

pub mod operations;
pub mod secret;
pub mod store;
pub mod validate;

// Re-export the most commonly used items.
pub use operations::Vault;
pub use secret::{
    PersistenceId, SecretAttributes, SecretHandle, SecretPersistence, SecretType, VaultHandle,
};
