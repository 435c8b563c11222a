//! `filevault prune`: drop entries whose ciphertext is gone.

use crate::cli::output;
use crate::cli::{open_vault, Cli};
use crate::errors::Result;

/// Execute the `prune` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let mut vault = open_vault(cli)?;

    let dropped = vault.prune_entries();
    if dropped.is_empty() {
        output::info("Every entry has its ciphertext.");
        return Ok(());
    }

    vault.close()?;

    for name in &dropped {
        output::warning(&format!("Dropped '{name}' (ciphertext missing)"));
    }
    output::success(&format!("Pruned {} dangling entry(ies)", dropped.len()));

    Ok(())
}
