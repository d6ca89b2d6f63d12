//! `keyvault info`: show a secret's attributes without loading its material.

use crate::cli::output;
use crate::cli::{open_vault, Cli};
use crate::errors::Result;
use crate::vault::PersistenceId;

/// Execute the `info` command.
pub fn execute(cli: &Cli, id: &str) -> Result<()> {
    let id = PersistenceId::parse(id)?;
    let vault = open_vault(cli)?;
    let header = vault.persistent_record_header(&id)?;
    output::print_record(&id, &header);
    Ok(())
}
