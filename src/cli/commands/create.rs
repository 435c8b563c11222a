//! `filevault create`: create a new, empty vault directory.

use std::path::Path;

use crate::cli::output;
use crate::cli::{prompt_new_password, Cli};
use crate::config::Settings;
use crate::crypto::CipherStrength;
use crate::errors::{FileVaultError, Result};
use crate::vault::Vault;

/// Execute the `create` command.
pub fn execute(_cli: &Cli, name: &str, strength: Option<CipherStrength>) -> Result<()> {
    let dir = Path::new(name);

    // Fail before prompting if the target is already taken.
    if dir.exists() {
        output::tip("Pass the existing directory with `--vault` to use it.");
        return Err(FileVaultError::VaultAlreadyExists(dir.to_path_buf()));
    }

    let cwd = std::env::current_dir()?;
    let settings = Settings::load(&cwd)?;
    let strength = strength.unwrap_or(settings.default_strength);

    let password = prompt_new_password(name)?;
    let vault = Vault::create(dir, password.as_bytes(), strength)?;

    output::success(&format!(
        "Vault created at {} ({})",
        vault.dir().display(),
        strength.cipher_name()
    ));
    output::tip(&format!("Run `filevault --vault {name} add <FILE>` to store a file."));

    vault.close()
}
