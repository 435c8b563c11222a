//! `filevault cleanup`: delete ciphertext files no entry refers to.

use crate::cli::output;
use crate::cli::{open_vault, Cli};
use crate::errors::Result;

/// Execute the `cleanup` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let vault = open_vault(cli)?;

    let removed = vault.cleanup()?;
    if removed.is_empty() {
        output::info("No orphaned files found.");
        return Ok(());
    }

    for path in &removed {
        output::info(&format!("Deleted {}", path.display()));
    }
    output::success(&format!("Removed {} orphaned file(s)", removed.len()));

    Ok(())
}
