//! `keyvault list`: display all persistent secrets in a table.

use crate::cli::output;
use crate::cli::{open_vault, Cli};
use crate::errors::Result;

/// Execute the `list` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let vault = open_vault(cli)?;

    let mut records = Vec::new();
    for id in vault.persistent_ids()? {
        match vault.persistent_record_header(&id) {
            Ok(header) => records.push((id, header)),
            Err(e) => output::warning(&format!("skipping {id}: {e}")),
        }
    }

    output::info(&format!("{} secret(s)", records.len()));
    output::print_records_table(&records);

    Ok(())
}
