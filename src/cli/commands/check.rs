//! `filevault check`: verify every ciphertext against its stored tag.

use crate::cli::output;
use crate::cli::{open_vault, Cli};
use crate::config::Settings;
use crate::errors::{FileVaultError, Result};

/// Execute the `check` command.
///
/// Fails when any entry's ciphertext does not match its tag.  Inconclusive
/// entries (missing or unreadable files) are reported but do not fail.
pub fn execute(cli: &Cli) -> Result<()> {
    let cwd = std::env::current_dir()?;
    let scanner = Settings::load(&cwd)?.integrity_scanner();

    let vault = open_vault(cli)?;
    let report = vault.integrity_test_with(&scanner);

    output::print_integrity_report(&report);

    if !report.inconclusive.is_empty() {
        output::tip("Run `filevault prune` to drop entries whose ciphertext is missing.");
    }

    if !report.is_clean() {
        return Err(FileVaultError::CommandFailed(format!(
            "{} of {} file(s) failed the integrity check",
            report.failed.len(),
            report.total()
        )));
    }

    output::success(&format!("{} file(s) passed", report.passed.len()));

    Ok(())
}
