//! `keyvault sha256`: hash a string, a file, or stdin.
//!
//! Runs in an in-memory vault, so no vault directory is touched.

use std::io::Read;

use crate::cli::Cli;
use crate::errors::Result;
use crate::registry::VaultRegistry;

/// Execute the `sha256` command.
pub fn execute(_cli: &Cli, input: Option<&str>, file: Option<&str>) -> Result<()> {
    let data = match (input, file) {
        (Some(text), _) => text.as_bytes().to_vec(),
        (None, Some(path)) => std::fs::read(path)?,
        (None, None) => {
            let mut buf = Vec::new();
            std::io::stdin().read_to_end(&mut buf)?;
            buf
        }
    };

    let registry = VaultRegistry::new();
    let vault = registry.get(registry.default_init()?)?;
    println!("{}", hex::encode(vault.sha256(&data)?));

    Ok(())
}
