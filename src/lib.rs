pub mod api;
#[cfg(feature = "audit-log")]
pub mod audit;
pub mod backend;
pub mod cli;
pub mod config;
pub mod crypto;
pub mod errors;
pub mod registry;
pub mod vault;

pub use errors::{Result, VaultError};
pub use registry::{VaultKind, VaultRegistry};
pub use vault::{
    PersistenceId, SecretAttributes, SecretHandle, SecretPersistence, SecretType, Vault,
    VaultHandle,
};
