//! `keyvault generate`: create a random persistent secret.
//!
//! Usage:
//!   keyvault generate aes
//!   keyvault generate p256
//!   keyvault generate buffer --length 48

use crate::cli::output;
use crate::cli::{open_vault, Cli};
use crate::errors::{Result, VaultError};
use crate::vault::{SecretAttributes, SecretPersistence, SecretType};

/// Execute the `generate` command.
pub fn execute(cli: &Cli, secret_type: &str, length: Option<usize>) -> Result<()> {
    let attributes = attributes_for(SecretType::from_name(secret_type)?, length)?;

    let vault = open_vault(cli)?;
    let handle = vault.secret_generate(attributes)?;
    let id = vault.get_persistence_id(handle)?;

    crate::cli::record_audit(
        cli,
        "generate",
        Some(id.as_str()),
        Some(attributes.secret_type.name()),
    );
    output::success(&format!(
        "Generated {} secret ({} bytes)",
        attributes.secret_type, attributes.length
    ));
    println!("{id}");

    Ok(())
}

fn attributes_for(secret_type: SecretType, length: Option<usize>) -> Result<SecretAttributes> {
    match (secret_type, length) {
        (SecretType::Buffer, Some(len)) => {
            Ok(SecretAttributes::buffer(len, SecretPersistence::Persistent))
        }
        (SecretType::Buffer, None) => Err(VaultError::CommandFailed(
            "buffer secrets need --length".into(),
        )),
        (other, Some(_)) => Err(VaultError::CommandFailed(format!(
            "--length only applies to buffer secrets, {other} has a fixed length"
        ))),
        (other, None) => Ok(SecretAttributes::for_type(
            other,
            SecretPersistence::Persistent,
        )),
    }
}
