//! CLI module: Clap argument parser, output helpers, and command implementations.

pub mod commands;
pub mod output;

use std::path::PathBuf;

use clap::Parser;

use zeroize::Zeroizing;

use crate::crypto::CipherStrength;
use crate::errors::{FileVaultError, Result};

/// Minimum passphrase length for new vaults.
const MIN_PASSWORD_LEN: usize = 8;

/// Environment variable consulted before prompting for a passphrase.
const PASSWORD_ENV: &str = "FILEVAULT_PASSWORD";

/// FileVault CLI: a password-protected vault for encrypted files.
#[derive(Parser)]
#[command(
    name = "filevault",
    about = "Password-protected vault for encrypted files",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Vault directory to operate on
    #[arg(long, env = "FILEVAULT_VAULT", global = true)]
    pub vault: Option<String>,

    /// Log filter when RUST_LOG is unset (e.g. warn, info, debug)
    #[arg(long, default_value = "warn", global = true)]
    pub log_level: String,
}

/// All available subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Create a new vault directory
    Create {
        /// Directory for the new vault
        name: String,
        /// Cipher strength: strong (AES-256), medium (AES-192) or weak (AES-128)
        #[arg(short, long)]
        strength: Option<CipherStrength>,
    },

    /// List the files stored in the vault
    List,

    /// Encrypt a file and add it to the vault
    #[command(alias = "encrypt")]
    Add {
        /// Path of the file to encrypt
        file: String,
    },

    /// Decrypt a file from the vault
    #[command(alias = "decrypt")]
    Retrieve {
        /// Name of the stored file
        name: String,
        /// Where to write the decrypted file (default: ./<name>)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Delete a file from the vault
    Remove {
        /// Name of the stored file
        name: String,
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Delete ciphertext files that no entry refers to
    Cleanup,

    /// Drop entries whose ciphertext file is missing
    Prune,

    /// Verify every ciphertext against its authentication tag
    Check,
}

// ---------------------------------------------------------------------------
// Shared helpers used by multiple commands
// ---------------------------------------------------------------------------

/// Get the vault passphrase, trying in order:
/// 1. `FILEVAULT_PASSWORD` env var (scripts/CI)
/// 2. Interactive prompt
///
/// Returns `Zeroizing<String>` so the passphrase is wiped from memory on drop.
pub fn prompt_password(vault_name: &str) -> Result<Zeroizing<String>> {
    if let Some(pw) = password_from_env() {
        return Ok(pw);
    }

    let pw = dialoguer::Password::new()
        .with_prompt(format!("Enter password for '{vault_name}'"))
        .interact()
        .map_err(|e| FileVaultError::CommandFailed(format!("password prompt: {e}")))?;
    Ok(Zeroizing::new(pw))
}

/// Prompt for a new passphrase with confirmation (used by `create`).
///
/// Also respects `FILEVAULT_PASSWORD` for scripted usage.
/// Enforces a minimum passphrase length.
pub fn prompt_new_password(vault_name: &str) -> Result<Zeroizing<String>> {
    if let Some(pw) = password_from_env() {
        if pw.len() < MIN_PASSWORD_LEN {
            return Err(FileVaultError::CommandFailed(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        return Ok(pw);
    }

    loop {
        let password = dialoguer::Password::new()
            .with_prompt(format!("Choose a password for '{vault_name}'"))
            .with_confirmation("Confirm password", "Passwords do not match, try again")
            .interact()
            .map_err(|e| FileVaultError::CommandFailed(format!("password prompt: {e}")))?;

        if password.len() < MIN_PASSWORD_LEN {
            output::warning(&format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters. Try again."
            ));
            continue;
        }

        return Ok(Zeroizing::new(password));
    }
}

fn password_from_env() -> Option<Zeroizing<String>> {
    match std::env::var(PASSWORD_ENV) {
        Ok(pw) if !pw.is_empty() => Some(Zeroizing::new(pw)),
        _ => None,
    }
}

/// The vault directory selected with `--vault`.
pub fn vault_dir(cli: &Cli) -> Result<PathBuf> {
    match &cli.vault {
        Some(dir) if !dir.is_empty() => Ok(PathBuf::from(dir)),
        _ => Err(FileVaultError::CommandFailed(
            "no vault selected; pass --vault <dir> or set FILEVAULT_VAULT".into(),
        )),
    }
}

/// Open the vault selected on the command line, prompting for its passphrase.
pub fn open_vault(cli: &Cli) -> Result<crate::vault::Vault> {
    let dir = vault_dir(cli)?;
    let password = prompt_password(&dir.display().to_string())?;
    crate::vault::Vault::open(&dir, password.as_bytes())
}
