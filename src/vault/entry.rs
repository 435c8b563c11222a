//! The metadata record for one stored file.
//!
//! Byte fields (`iv`, `auth_tag`) use the base64 serde helpers from
//! `format.rs` so they serialize as strings in the metadata JSON.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::format::{base64_decode, base64_encode};
use crate::crypto::FileSeal;

/// One encrypted file in the vault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultEntry {
    /// The file's name as the user knows it (the lookup key).
    pub original_name: String,

    /// Ciphertext file name, relative to the vault directory.
    pub ciphertext_path: String,

    /// CBC initialization vector (one block).
    #[serde(serialize_with = "base64_encode", deserialize_with = "base64_decode")]
    pub iv: Vec<u8>,

    /// Exact plaintext length in bytes.
    pub plaintext_size: u64,

    /// Zero bytes appended to the final block (always < 16).
    pub padding_len: u64,

    /// HMAC-SHA256 over the full ciphertext.
    #[serde(serialize_with = "base64_encode", deserialize_with = "base64_decode")]
    pub auth_tag: Vec<u8>,
}

impl VaultEntry {
    /// Build an entry from the parameters produced by encryption.
    pub fn from_seal(original_name: &str, ciphertext_path: &str, seal: FileSeal) -> Self {
        Self {
            original_name: original_name.to_string(),
            ciphertext_path: ciphertext_path.to_string(),
            iv: seal.iv,
            plaintext_size: seal.plaintext_size,
            padding_len: seal.padding_len,
            auth_tag: seal.auth_tag,
        }
    }

    /// Expected ciphertext length on disk.
    pub fn ciphertext_size(&self) -> u64 {
        self.plaintext_size + self.padding_len
    }
}

/// Deterministic, filesystem-safe ciphertext name for an original name:
/// URL-safe unpadded base64 of `SHA-256(original_name)`.
pub fn ciphertext_name(original_name: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(original_name.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ciphertext_name_is_deterministic_and_path_safe() {
        let a = ciphertext_name("report.pdf");
        assert_eq!(a, ciphertext_name("report.pdf"));
        assert_ne!(a, ciphertext_name("report.pdf.bak"));
        assert_eq!(a.len(), 43);
        assert!(!a.contains('/') && !a.contains('='));
    }

    #[test]
    fn entry_serializes_bytes_as_base64() {
        let entry = VaultEntry {
            original_name: "a.txt".into(),
            ciphertext_path: ciphertext_name("a.txt"),
            iv: vec![0xFF; 16],
            plaintext_size: 40,
            padding_len: 8,
            auth_tag: vec![1; 32],
        };
        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("\"iv\":\"/////////////////////w==\""));

        let back: VaultEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back, entry);
        assert_eq!(back.ciphertext_size(), 48);
    }
}
