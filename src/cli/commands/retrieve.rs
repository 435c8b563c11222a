//! `filevault retrieve`: decrypt a stored file.

use std::path::Path;

use crate::cli::output;
use crate::cli::{open_vault, Cli};
use crate::errors::Result;

/// Execute the `retrieve` command.
pub fn execute(cli: &Cli, name: &str, out: Option<&str>) -> Result<()> {
    let vault = open_vault(cli)?;

    let written = vault.retrieve(name, out.map(Path::new))?;
    output::success(&format!("Decrypted '{name}' to {}", written.display()));

    Ok(())
}
