use std::path::PathBuf;
use thiserror::Error;

/// All errors that can occur in FileVault.
#[derive(Debug, Error)]
pub enum FileVaultError {
    // --- Crypto errors ---
    #[error("Invalid key length {0}: expected 16, 24 or 32 bytes")]
    InvalidKeyLength(usize),

    #[error("Invalid IV: expected at least {expected} bytes, got {actual}")]
    InvalidIv { expected: usize, actual: usize },

    #[error("Cannot obtain randomness for IV: {0}")]
    EntropyUnavailable(String),

    #[error("Data length {0} is not a multiple of the cipher block size")]
    UnalignedData(usize),

    #[error("Authentication failed for '{0}': ciphertext tampered or corrupted")]
    AuthenticationFailed(String),

    // --- Vault errors ---
    #[error("Vault not found at {0}")]
    VaultNotFound(PathBuf),

    #[error("Vault already exists at {0}")]
    VaultAlreadyExists(PathBuf),

    #[error("Incorrect password or corrupted vault ({0})")]
    CorruptVault(String),

    #[error("No entry for '{0}' in vault")]
    EntryNotFound(String),

    #[error("An entry named '{0}' already exists (remove it first)")]
    EntryAlreadyExists(String),

    #[error("Invalid file name: {0}")]
    InvalidFileName(String),

    // --- Config errors ---
    #[error("Config file error: {0}")]
    ConfigError(String),

    // --- IO errors ---
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // --- Serialization errors ---
    #[error("Serialization error: {0}")]
    SerializationError(String),

    // --- CLI errors ---
    #[error("Command failed: {0}")]
    CommandFailed(String),
}

/// Convenience type alias for FileVault results.
pub type Result<T> = std::result::Result<T, FileVaultError>;
