use thiserror::Error;

/// All errors that can occur in KeyVault.
#[derive(Debug, Error)]
pub enum VaultError {
    // --- Handle errors ---
    #[error("Invalid handle: {0}")]
    InvalidHandle(String),

    // --- Input errors (rejected before any state mutation) ---
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Persistent secrets are not supported by this vault")]
    UnsupportedPersistence,

    #[error("Invalid key material: {0}")]
    InvalidKeyMaterial(String),

    #[error("Secret type {actual} cannot be used here (expected {expected})")]
    WrongSecretType { expected: String, actual: String },

    #[error("Invalid peer public key: {0}")]
    InvalidPeerKey(String),

    #[error("Too many HKDF outputs: {requested} bytes requested, at most {max} allowed")]
    TooManyOutputs { requested: usize, max: usize },

    // --- Output errors ---
    #[error("Buffer too small: {required} bytes required, {provided} provided")]
    BufferTooSmall { required: usize, provided: usize },

    // --- Crypto errors ---
    #[error("Authentication failed: ciphertext or tag has been modified")]
    AuthenticationFailed,

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    // --- Persistence errors ---
    #[error("No persistent secret found for '{0}'")]
    NotFound(String),

    #[error("Secret {0} is not persistent")]
    NotPersistent(u64),

    #[error("Invalid record format: {0}")]
    InvalidRecordFormat(String),

    // --- Backend / filesystem errors ---
    #[error("Vault initialization failed: {0}")]
    InitError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // --- Config errors ---
    #[error("Config file error: {0}")]
    ConfigError(String),

    // --- Serialization errors ---
    #[error("Serialization error: {0}")]
    SerializationError(String),

    // --- CLI errors ---
    #[error("Command failed: {0}")]
    CommandFailed(String),

    #[error("Audit error: {0}")]
    AuditError(String),
}

impl VaultError {
    /// Stable numeric code reported across the boundary.
    pub fn code(&self) -> i32 {
        match self {
            VaultError::InvalidHandle(_) => 1,
            VaultError::InvalidArgument(_) => 2,
            VaultError::UnsupportedPersistence => 3,
            VaultError::InvalidKeyMaterial(_) => 4,
            VaultError::WrongSecretType { .. } => 5,
            VaultError::InvalidPeerKey(_) => 6,
            VaultError::TooManyOutputs { .. } => 7,
            VaultError::BufferTooSmall { .. } => 8,
            VaultError::AuthenticationFailed => 9,
            VaultError::EncryptionFailed(_) => 10,
            VaultError::KeyDerivationFailed(_) => 11,
            VaultError::NotFound(_) => 12,
            VaultError::NotPersistent(_) => 13,
            VaultError::InvalidRecordFormat(_) => 14,
            VaultError::InitError(_) => 15,
            VaultError::Io(_) => 16,
            VaultError::ConfigError(_) => 17,
            VaultError::SerializationError(_) => 18,
            VaultError::CommandFailed(_) => 19,
            VaultError::AuditError(_) => 20,
        }
    }

    pub(crate) fn wrong_type(expected: &str, actual: impl std::fmt::Display) -> Self {
        VaultError::WrongSecretType {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }
}

/// Convenience type alias for KeyVault results.
pub type Result<T> = std::result::Result<T, VaultError>;
