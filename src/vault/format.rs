//! Encrypted vault metadata file.
//!
//! Every vault directory holds exactly one metadata file, `vault.bin`:
//!
//! ```text
//! AES-CBC( fixed IV, JSON document || zero padding to 16 bytes )
//! ```
//!
//! The JSON document is `{ "version", "strength", "entries": [...] }`.
//! There is no plaintext header and no tag on the blob, so a wrong key and
//! a corrupted file look the same: both fail to deserialize and surface as
//! `CorruptVault`.
//!
//! The IV is a fixed constant so existing vaults stay readable.  It is
//! reused on every save of every vault.

use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;
use zeroize::Zeroize;

use super::entry::VaultEntry;
use crate::crypto::{BlockCipherEngine, CipherStrength, VaultKey, BLOCK_SIZE};
use crate::errors::{FileVaultError, Result};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Name of the metadata file inside the vault directory.
pub const METADATA_FILE: &str = "vault.bin";

/// Temp name used while the metadata file is rewritten.
const METADATA_TMP_FILE: &str = ".vault.bin.tmp";

/// Current metadata document version.
pub const CURRENT_VERSION: u8 = 1;

/// IV for metadata encryption.  Only the first block is used.
const METADATA_IV: [u8; 32] = [
    0x7f, 0x4a, 0xe2, 0x38, 0x31, 0xd5, 0x4c, 0x05, 0xfe, 0x4c, 0x36, 0xb4, 0x83, 0x79, 0x51,
    0xa8, 0x51, 0xb7, 0xd1, 0xe1, 0x9e, 0x71, 0x3f, 0xfb, 0xa1, 0xae, 0x35, 0xec, 0x50, 0x4e,
    0x74, 0xdc,
];

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// Decoded contents of a metadata file.
#[derive(Debug, Clone, Deserialize)]
pub struct VaultMetadata {
    pub version: u8,
    pub strength: CipherStrength,
    pub entries: Vec<VaultEntry>,
}

#[derive(Serialize)]
struct MetadataDocument<'a> {
    version: u8,
    strength: CipherStrength,
    entries: &'a [VaultEntry],
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Path of the metadata file for the vault at `dir`.
pub fn metadata_path(dir: &Path) -> PathBuf {
    dir.join(METADATA_FILE)
}

/// True for directory entries owned by the metadata layer rather than
/// ciphertext files.
pub fn is_metadata_file(name: &OsStr) -> bool {
    name == OsStr::new(METADATA_FILE) || name == OsStr::new(METADATA_TMP_FILE)
}

/// Serialize `entries` and encrypt them under `key` with the fixed IV.
pub fn encode(entries: &[VaultEntry], key: &VaultKey) -> Result<Vec<u8>> {
    let doc = MetadataDocument {
        version: CURRENT_VERSION,
        strength: key.strength(),
        entries,
    };
    let mut buf = serde_json::to_vec(&doc)
        .map_err(|e| FileVaultError::SerializationError(format!("metadata: {e}")))?;

    let overflow = buf.len() % BLOCK_SIZE;
    if overflow != 0 {
        buf.resize(buf.len() + BLOCK_SIZE - overflow, 0);
    }

    let engine = BlockCipherEngine::new(key)?;
    let (mut encryptor, _) = engine.make_encryptor(Some(&METADATA_IV))?;
    encryptor.encrypt_blocks(&mut buf)?;

    Ok(buf)
}

/// Decrypt and deserialize a metadata blob.
///
/// Fails with `CorruptVault` if the blob is not block-aligned, does not
/// deserialize, or was written for a different strength than `key`'s.
pub fn decode(ciphertext: &[u8], key: &VaultKey) -> Result<VaultMetadata> {
    if ciphertext.len() % BLOCK_SIZE != 0 {
        return Err(FileVaultError::CorruptVault(format!(
            "metadata length {} is not a multiple of {BLOCK_SIZE}",
            ciphertext.len()
        )));
    }

    let engine = BlockCipherEngine::new(key)?;
    let mut decryptor = engine.make_decryptor(&METADATA_IV)?;
    let mut buf = ciphertext.to_vec();
    decryptor.decrypt_blocks(&mut buf)?;

    // JSON never ends in NUL, so every trailing zero byte is padding.
    let end = buf.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    let parsed: std::result::Result<VaultMetadata, _> = serde_json::from_slice(&buf[..end]);
    buf.zeroize();

    let metadata =
        parsed.map_err(|_| FileVaultError::CorruptVault("metadata did not decode".into()))?;

    if metadata.version != CURRENT_VERSION {
        return Err(FileVaultError::CorruptVault(format!(
            "unsupported metadata version {}, expected {CURRENT_VERSION}",
            metadata.version
        )));
    }
    if metadata.strength != key.strength() {
        return Err(FileVaultError::CorruptVault(format!(
            "metadata written for {} strength",
            metadata.strength
        )));
    }

    Ok(metadata)
}

/// Encrypt `entries` and replace the vault's metadata file **atomically**.
///
/// The blob goes to a temp file in the vault directory first and is then
/// renamed over `vault.bin`, so a crash mid-write leaves the old file intact.
pub fn write_metadata(dir: &Path, entries: &[VaultEntry], key: &VaultKey) -> Result<()> {
    let blob = encode(entries, key)?;

    let tmp_path = dir.join(METADATA_TMP_FILE);
    fs::write(&tmp_path, &blob)?;
    fs::rename(&tmp_path, metadata_path(dir))?;

    debug!(entries = entries.len(), bytes = blob.len(), "metadata written");
    Ok(())
}

/// Read the raw metadata blob of the vault at `dir`.
pub fn read_metadata(dir: &Path) -> Result<Vec<u8>> {
    match fs::read(metadata_path(dir)) {
        Ok(data) => Ok(data),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            Err(FileVaultError::VaultNotFound(dir.to_path_buf()))
        }
        Err(e) => Err(e.into()),
    }
}

// ---------------------------------------------------------------------------
// Serde helpers for base64-encoded Vec<u8> fields
// ---------------------------------------------------------------------------

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

pub(crate) fn base64_encode<S>(data: &[u8], serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    let encoded = BASE64.encode(data);
    serializer.serialize_str(&encoded)
}

pub(crate) fn base64_decode<'de, D>(deserializer: D) -> std::result::Result<Vec<u8>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    BASE64.decode(&s).map_err(serde::de::Error::custom)
}
