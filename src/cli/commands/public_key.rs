//! `keyvault public-key`: print the public half of a private-key secret.

use crate::cli::{load_secret, open_vault, Cli};
use crate::crypto::ecdh;
use crate::errors::Result;

/// Execute the `public-key` command.
pub fn execute(cli: &Cli, id: &str) -> Result<()> {
    let vault = open_vault(cli)?;
    let (_, handle) = load_secret(&vault, id)?;

    let secret_type = vault.secret_attributes_get(handle)?.secret_type;
    let mut buf = vec![0u8; ecdh::public_key_len(secret_type)?];
    let written = vault.secret_public_key_get(handle, &mut buf)?;

    println!("{}", hex::encode(&buf[..written]));
    Ok(())
}
