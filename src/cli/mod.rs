//! CLI module: Clap argument parser, output helpers, and command implementations.
//!
//! Every command opens a file-backed vault rooted at the vault directory,
//! addresses secrets by persistence id, and closes the vault on exit.

pub mod commands;
pub mod output;

use std::ops::Deref;
use std::path::PathBuf;
use std::sync::Arc;

use base64::Engine;
use clap::Parser;
use zeroize::Zeroizing;

use crate::config::Settings;
use crate::errors::{Result, VaultError};
use crate::registry::VaultRegistry;
use crate::vault::{PersistenceId, SecretHandle, Vault};

/// KeyVault CLI: opaque secrets, ECDH, HKDF and AEAD by handle.
#[derive(Parser)]
#[command(
    name = "keyvault",
    about = "Handle-based secret vault for keys that never leave it",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Vault directory (default: from keyvault.toml, else .keyvault)
    #[arg(long, global = true, env = "KEYVAULT_DIR")]
    pub vault_dir: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Text encoding for material on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Encoding {
    Hex,
    Base64,
}

/// All available subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Generate a new persistent secret and print its id
    Generate {
        /// Secret type: buffer, aes, curve25519, p256
        secret_type: String,
        /// Length in bytes (buffer only)
        #[arg(short, long)]
        length: Option<usize>,
    },

    /// Import material as a new persistent secret
    Import {
        /// Secret type: buffer, aes, curve25519, p256
        secret_type: String,
        /// Encoded material (omit for a hidden prompt)
        value: Option<String>,
        /// Encoding of the value
        #[arg(short, long, value_enum, default_value = "hex")]
        encoding: Encoding,
    },

    /// Print the raw bytes of a buffer or AES secret
    Export {
        /// Persistence id
        id: String,
        /// Output encoding
        #[arg(short, long, value_enum, default_value = "hex")]
        encoding: Encoding,
    },

    /// Print the public key of a curve25519 or p256 secret
    PublicKey {
        /// Persistence id
        id: String,
    },

    /// Show the attributes of a secret
    Info {
        /// Persistence id
        id: String,
    },

    /// Destroy a secret and its stored record
    Destroy {
        /// Persistence id
        id: String,
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// List all persistent secrets
    List,

    /// Print the SHA-256 of a string or file
    Sha256 {
        /// Input string (reads --file or stdin if omitted)
        input: Option<String>,
        /// Hash the contents of this file
        #[arg(short, long, conflicts_with = "input")]
        file: Option<String>,
    },

    /// Show version
    Version,

    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },

    /// View the audit log of vault operations
    Audit {
        /// Number of entries to show (default: 50)
        #[arg(long, default_value = "50")]
        last: usize,
        /// Show entries since a duration ago (e.g. 7d, 24h, 30m)
        #[arg(long)]
        since: Option<String>,
    },
}

// ---------------------------------------------------------------------------
// Shared helpers used by multiple commands
// ---------------------------------------------------------------------------

/// Resolve the vault directory: `--vault-dir`, then `keyvault.toml`,
/// relative to the current directory.
pub fn vault_dir(cli: &Cli) -> Result<PathBuf> {
    let cwd = std::env::current_dir()?;
    match &cli.vault_dir {
        Some(dir) => Ok(cwd.join(dir)),
        None => Ok(Settings::load(&cwd)?.vault_path(&cwd)),
    }
}

/// A file-backed vault open for the duration of one command.
///
/// Dropping it closes the vault and scrubs every loaded secret.
pub struct OpenVault {
    vault: Arc<Vault>,
    _registry: VaultRegistry,
}

impl Deref for OpenVault {
    type Target = Vault;

    fn deref(&self) -> &Vault {
        &self.vault
    }
}

/// Open the file-backed vault the CLI is pointed at.
pub fn open_vault(cli: &Cli) -> Result<OpenVault> {
    let dir = vault_dir(cli)?;
    let registry = VaultRegistry::new();
    let handle = registry.file_init(&dir)?;
    let vault = registry.get(handle)?;
    Ok(OpenVault {
        vault,
        _registry: registry,
    })
}

/// Load the secret stored under `id` into the vault.
pub fn load_secret(vault: &Vault, id: &str) -> Result<(PersistenceId, SecretHandle)> {
    let id = PersistenceId::parse(id)?;
    let handle = vault.get_persistent_secret(&id)?;
    Ok((id, handle))
}

/// Decode command-line material.
pub fn decode_material(value: &str, encoding: Encoding) -> Result<Zeroizing<Vec<u8>>> {
    let trimmed = value.trim();
    let bytes = match encoding {
        Encoding::Hex => hex::decode(trimmed)
            .map_err(|e| VaultError::InvalidArgument(format!("invalid hex: {e}")))?,
        Encoding::Base64 => base64::engine::general_purpose::STANDARD
            .decode(trimmed)
            .map_err(|e| VaultError::InvalidArgument(format!("invalid base64: {e}")))?,
    };
    Ok(Zeroizing::new(bytes))
}

/// Encode bytes for printing.
pub fn encode_material(bytes: &[u8], encoding: Encoding) -> Zeroizing<String> {
    Zeroizing::new(match encoding {
        Encoding::Hex => hex::encode(bytes),
        Encoding::Base64 => base64::engine::general_purpose::STANDARD.encode(bytes),
    })
}

/// Record a CLI operation in the audit log, if this build has one.
pub fn record_audit(cli: &Cli, op: &str, secret_id: Option<&str>, details: Option<&str>) {
    #[cfg(feature = "audit-log")]
    crate::audit::log_audit(cli, op, secret_id, details);

    #[cfg(not(feature = "audit-log"))]
    let _ = (cli, op, secret_id, details);
}

/// Prompt for material without echoing it.
pub fn prompt_material() -> Result<Zeroizing<String>> {
    let value = dialoguer::Password::new()
        .with_prompt("Secret material")
        .interact()
        .map_err(|e| VaultError::CommandFailed(format!("material prompt: {e}")))?;
    Ok(Zeroizing::new(value))
}
