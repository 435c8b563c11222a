//! Vault module: encrypted file storage.
//!
//! This module provides:
//! - `VaultEntry`, the per-file metadata record (`entry`)
//! - `EntryStore`, the in-memory entry collection (`entries`)
//! - The encrypted metadata file format (`format`)
//! - Orphan cleanup and dangling-entry pruning (`maintenance`)
//! - The bounded-concurrency integrity scan (`integrity`)
//! - High-level `Vault` for creating, opening, and managing vaults (`store`)

pub mod entries;
pub mod entry;
pub mod format;
pub mod integrity;
pub mod maintenance;
pub mod store;

// Re-export the most commonly used items.
pub use entries::EntryStore;
pub use entry::{ciphertext_name, VaultEntry};
pub use format::METADATA_FILE;
pub use integrity::{IntegrityReport, IntegrityScanner, Outcome, ScanHook};
pub use store::Vault;
