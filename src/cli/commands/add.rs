//! `filevault add`: encrypt a file into the vault.

use std::path::Path;

use crate::cli::output;
use crate::cli::{open_vault, Cli};
use crate::errors::Result;

/// Execute the `add` command.
pub fn execute(cli: &Cli, file: &str) -> Result<()> {
    let mut vault = open_vault(cli)?;

    let entry = vault.add(Path::new(file))?;
    let msg = format!(
        "Added '{}' ({})",
        entry.original_name,
        output::human_size(entry.plaintext_size)
    );

    vault.close()?;
    output::success(&msg);

    Ok(())
}
