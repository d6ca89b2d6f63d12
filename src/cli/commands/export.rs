//! `keyvault export`: print the raw bytes of a buffer or AES secret.

use zeroize::Zeroizing;

use crate::cli::{encode_material, load_secret, open_vault, Cli, Encoding};
use crate::errors::Result;

/// Execute the `export` command.
pub fn execute(cli: &Cli, id: &str, encoding: Encoding) -> Result<()> {
    let vault = open_vault(cli)?;
    let (id, handle) = load_secret(&vault, id)?;

    let length = vault.secret_attributes_get(handle)?.length;
    let mut buf = Zeroizing::new(vec![0u8; length]);
    let written = vault.secret_export(handle, &mut buf)?;

    crate::cli::record_audit(cli, "export", Some(id.as_str()), None);
    println!("{}", *encode_material(&buf[..written], encoding));

    Ok(())
}
