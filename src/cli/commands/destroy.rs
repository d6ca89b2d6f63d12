//! `keyvault destroy`: scrub a secret and delete its stored record.

use dialoguer::Confirm;

use crate::cli::output;
use crate::cli::{load_secret, open_vault, Cli};
use crate::errors::{Result, VaultError};

/// Execute the `destroy` command.
pub fn execute(cli: &Cli, id: &str, force: bool) -> Result<()> {
    let vault = open_vault(cli)?;
    let (id, handle) = load_secret(&vault, id)?;

    // Unless --force is set, ask for confirmation before destroying.
    if !force {
        let confirmed = Confirm::new()
            .with_prompt(format!("Destroy secret {id}? This cannot be undone"))
            .default(false)
            .interact()
            .map_err(|e| VaultError::CommandFailed(format!("confirm prompt: {e}")))?;

        if !confirmed {
            output::info("Cancelled.");
            return Ok(());
        }
    }

    vault.secret_destroy(handle)?;

    crate::cli::record_audit(cli, "destroy", Some(id.as_str()), None);
    output::success(&format!("Destroyed secret {id}"));

    Ok(())
}
