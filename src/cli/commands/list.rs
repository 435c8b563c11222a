//! `filevault list`: display the stored files in a table.

use crate::cli::output;
use crate::cli::{open_vault, Cli};
use crate::errors::Result;

/// Execute the `list` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let vault = open_vault(cli)?;
    let entries = vault.list_entries();

    output::info(&format!(
        "{} ({}): {} file(s)",
        vault.dir().display(),
        vault.strength().cipher_name(),
        entries.len()
    ));

    output::print_entries_table(entries);

    Ok(())
}
