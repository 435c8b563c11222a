//! `filevault remove`: delete a stored file from the vault.

use dialoguer::Confirm;

use crate::cli::output;
use crate::cli::{open_vault, Cli};
use crate::errors::{FileVaultError, Result};

/// Execute the `remove` command.
pub fn execute(cli: &Cli, name: &str, force: bool) -> Result<()> {
    let mut vault = open_vault(cli)?;

    if vault.entry(name).is_none() {
        return Err(FileVaultError::EntryNotFound(name.to_string()));
    }

    // Unless --force is set, ask for confirmation before deleting.
    if !force {
        let confirmed = Confirm::new()
            .with_prompt(format!("Remove '{name}' from the vault?"))
            .default(false)
            .interact()
            .map_err(|e| FileVaultError::CommandFailed(format!("confirm prompt: {e}")))?;

        if !confirmed {
            output::info("Cancelled.");
            return Ok(());
        }
    }

    vault.remove(name)?;
    vault.close()?;

    output::success(&format!("Removed '{name}'"));

    Ok(())
}
