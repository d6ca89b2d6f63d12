//! `keyvault import`: store caller-supplied material as a persistent secret.
//!
//! Usage:
//!   keyvault import aes 000102...1f
//!   keyvault import buffer --encoding base64 aGVsbG8=
//!   keyvault import curve25519          # prompts without echo

use zeroize::Zeroizing;

use crate::cli::output;
use crate::cli::{decode_material, open_vault, prompt_material, Cli, Encoding};
use crate::errors::Result;
use crate::vault::{SecretAttributes, SecretPersistence, SecretType};

/// Execute the `import` command.
pub fn execute(
    cli: &Cli,
    secret_type: &str,
    value: Option<&str>,
    encoding: Encoding,
) -> Result<()> {
    let secret_type = SecretType::from_name(secret_type)?;

    let text = match value {
        Some(v) => Zeroizing::new(v.to_string()),
        None => prompt_material()?,
    };
    let material = decode_material(&text, encoding)?;

    let attributes = match secret_type {
        SecretType::Buffer => SecretAttributes::buffer(material.len(), SecretPersistence::Persistent),
        other => SecretAttributes::for_type(other, SecretPersistence::Persistent),
    };

    let vault = open_vault(cli)?;
    let handle = vault.secret_import(attributes, &material)?;
    let id = vault.get_persistence_id(handle)?;

    crate::cli::record_audit(cli, "import", Some(id.as_str()), Some(secret_type.name()));
    output::success(&format!(
        "Imported {secret_type} secret ({} bytes)",
        material.len()
    ));
    println!("{id}");

    Ok(())
}
