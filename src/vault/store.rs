//! High-level vault operations used by CLI commands.
//!
//! `Vault` ties the key, the entry store and the on-disk directory together
//! so callers can write `vault.add(path)?; vault.close()?;`.
//!
//! Mutations are buffered in memory.  Nothing is persisted until `save` or
//! `close` rewrites the metadata file, so dropping a `Vault` without closing
//! it discards every change made since it was opened.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::crypto::{CipherStrength, FileCryptoCodec, VaultKey};
use crate::errors::{FileVaultError, Result};

use super::entries::EntryStore;
use super::entry::{ciphertext_name, VaultEntry};
use super::format;
use super::integrity::{IntegrityReport, IntegrityScanner};
use super::maintenance;

/// An open vault.  Create one with `Vault::create` or `Vault::open`.
pub struct Vault {
    /// The vault directory.
    dir: PathBuf,

    /// In-memory entry index.
    entries: EntryStore,

    /// Derived key (zeroized on drop).
    key: VaultKey,
}

impl Vault {
    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    /// Create a new, empty vault directory at `dir`.
    ///
    /// Fails with `VaultAlreadyExists` if anything exists at `dir`.  The
    /// parent directory must already exist.  An empty metadata file is
    /// written immediately so the vault can be opened even if it is never
    /// closed.  If that first write fails the new directory is removed
    /// again, so `create` can be retried.
    pub fn create(dir: &Path, passphrase: &[u8], strength: CipherStrength) -> Result<Self> {
        Self::create_with_key(dir, VaultKey::derive(passphrase, strength))
    }

    fn create_with_key(dir: &Path, key: VaultKey) -> Result<Self> {
        if let Err(e) = fs::create_dir(dir) {
            return Err(match e.kind() {
                io::ErrorKind::AlreadyExists => FileVaultError::VaultAlreadyExists(dir.into()),
                _ => e.into(),
            });
        }

        let strength = key.strength();
        let vault = Self {
            dir: dir.to_path_buf(),
            entries: EntryStore::new(),
            key,
        };
        if let Err(e) = vault.save() {
            if let Err(rm) = fs::remove_dir_all(dir) {
                warn!(dir = %dir.display(), "failed to remove half-created vault: {rm}");
            }
            return Err(e);
        }

        info!(dir = %dir.display(), cipher = strength.cipher_name(), "vault created");
        Ok(vault)
    }

    /// Open the vault at `dir`, detecting its cipher strength.
    ///
    /// Each strength is tried strongest first; the first key whose metadata
    /// decodes wins.  A wrong passphrase and a corrupted metadata file are
    /// indistinguishable and both fail with `CorruptVault`.
    pub fn open(dir: &Path, passphrase: &[u8]) -> Result<Self> {
        let blob = Self::read_blob(dir)?;

        for strength in CipherStrength::ALL {
            let key = VaultKey::derive(passphrase, strength);
            match format::decode(&blob, &key) {
                Ok(metadata) => return Ok(Self::assemble(dir, key, metadata.entries)),
                Err(FileVaultError::CorruptVault(reason)) => {
                    debug!(strength = %strength, "metadata rejected: {reason}");
                }
                Err(e) => return Err(e),
            }
        }

        Err(FileVaultError::CorruptVault(
            "metadata did not decode with any cipher strength".into(),
        ))
    }

    /// Open the vault at `dir` with a known cipher strength.
    pub fn open_with_strength(
        dir: &Path,
        passphrase: &[u8],
        strength: CipherStrength,
    ) -> Result<Self> {
        let blob = Self::read_blob(dir)?;
        let key = VaultKey::derive(passphrase, strength);
        let metadata = format::decode(&blob, &key)?;
        Ok(Self::assemble(dir, key, metadata.entries))
    }

    fn read_blob(dir: &Path) -> Result<Vec<u8>> {
        if !dir.is_dir() {
            return Err(FileVaultError::VaultNotFound(dir.to_path_buf()));
        }
        format::read_metadata(dir)
    }

    fn assemble(dir: &Path, key: VaultKey, entries: Vec<VaultEntry>) -> Self {
        info!(
            dir = %dir.display(),
            cipher = key.strength().cipher_name(),
            entries = entries.len(),
            "vault opened"
        );
        Self {
            dir: dir.to_path_buf(),
            entries: EntryStore::from(entries),
            key,
        }
    }

    // ------------------------------------------------------------------
    // File operations
    // ------------------------------------------------------------------

    /// Encrypt the file at `path` into the vault.
    ///
    /// The entry is named after the file name component of `path`.  A name
    /// that is already stored is rejected, since both would map to the same
    /// ciphertext file.
    pub fn add(&mut self, path: &Path) -> Result<&VaultEntry> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                FileVaultError::InvalidFileName(format!(
                    "{} has no UTF-8 file name",
                    path.display()
                ))
            })?
            .to_string();

        if self.entries.lookup(&name).is_some() {
            return Err(FileVaultError::EntryAlreadyExists(name));
        }

        let ct_name = ciphertext_name(&name);
        let ct_path = self.dir.join(&ct_name);
        let codec = FileCryptoCodec::new(&self.key)?;

        let seal = match codec.encrypt_file(path, &ct_path) {
            Ok(seal) => seal,
            Err(e) => {
                // Don't leave a half-written ciphertext behind.
                if ct_path.exists() {
                    let _ = fs::remove_file(&ct_path);
                }
                return Err(e);
            }
        };

        info!(entry = %name, size = seal.plaintext_size, "file added");
        self.entries
            .add(VaultEntry::from_seal(&name, &ct_name, seal));

        let idx = self.entries.len() - 1;
        Ok(&self.entries.as_slice()[idx])
    }

    /// Decrypt the entry `name` to `output`, or to `./<name>` when `None`.
    ///
    /// The tag is verified before anything is written at the destination.
    /// Returns the path the plaintext was written to.
    pub fn retrieve(&self, name: &str, output: Option<&Path>) -> Result<PathBuf> {
        let entry = self
            .entries
            .lookup(name)
            .ok_or_else(|| FileVaultError::EntryNotFound(name.to_string()))?;

        let dest = match output {
            Some(p) => p.to_path_buf(),
            None => PathBuf::from(&entry.original_name),
        };

        let codec = FileCryptoCodec::new(&self.key)?;
        codec.decrypt_file(entry, &self.dir.join(&entry.ciphertext_path), &dest)?;

        info!(entry = %name, dest = %dest.display(), "file retrieved");
        Ok(dest)
    }

    /// Delete the entry `name` and its ciphertext.
    ///
    /// An already-missing ciphertext is not an error.  The last entry is
    /// moved into the removed slot, so entry order changes.
    pub fn remove(&mut self, name: &str) -> Result<VaultEntry> {
        let entry = self
            .entries
            .lookup(name)
            .ok_or_else(|| FileVaultError::EntryNotFound(name.to_string()))?;

        let ct_path = self.dir.join(&entry.ciphertext_path);
        match fs::remove_file(&ct_path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!(entry = %name, "ciphertext already missing");
            }
            Err(e) => return Err(e.into()),
        }

        let removed = self
            .entries
            .remove(name)
            .ok_or_else(|| FileVaultError::EntryNotFound(name.to_string()))?;
        info!(entry = %name, "file removed");
        Ok(removed)
    }

    /// All entries, in store order.
    pub fn list_entries(&self) -> &[VaultEntry] {
        self.entries.as_slice()
    }

    // ------------------------------------------------------------------
    // Maintenance
    // ------------------------------------------------------------------

    /// Delete ciphertext files that no entry references.
    pub fn cleanup(&self) -> Result<Vec<PathBuf>> {
        maintenance::cleanup(&self.dir, &self.entries)
    }

    /// Drop entries whose ciphertext file no longer exists.
    pub fn prune_entries(&mut self) -> Vec<String> {
        maintenance::prune_entries(&self.dir, &mut self.entries)
    }

    /// Verify every ciphertext with the default concurrency bound.
    pub fn integrity_test(&self) -> IntegrityReport {
        self.integrity_test_with(&IntegrityScanner::default())
    }

    /// Verify every ciphertext using `scanner`.
    pub fn integrity_test_with(&self, scanner: &IntegrityScanner) -> IntegrityReport {
        scanner.scan(&self.dir, &self.key, self.entries.as_slice())
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Rewrite the metadata file from the in-memory entries.
    pub fn save(&self) -> Result<()> {
        format::write_metadata(&self.dir, self.entries.as_slice(), &self.key)
    }

    /// Persist and release the vault.
    pub fn close(self) -> Result<()> {
        self.save()?;
        debug!(dir = %self.dir.display(), "vault closed");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// Returns the vault directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the cipher strength chosen at creation.
    pub fn strength(&self) -> CipherStrength {
        self.key.strength()
    }

    /// Returns the number of entries in the vault.
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Look up an entry by original name without decrypting anything.
    pub fn entry(&self, name: &str) -> Option<&VaultEntry> {
        self.entries.lookup(name)
    }
}
