//! Passphrase-to-key derivation.
//!
//! The cipher key is the leading N bytes of `SHA-256(passphrase)`, where N
//! is selected by the vault's `CipherStrength`:
//!
//! | strength | key length | cipher  |
//! |----------|------------|---------|
//! | Strong   | 32 bytes   | AES-256 |
//! | Medium   | 24 bytes   | AES-192 |
//! | Weak     | 16 bytes   | AES-128 |
//!
//! There is no salt.  Identical passphrase + strength always yields the
//! identical key, which is what lets a vault be re-opened without any
//! plaintext header on disk.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::errors::{FileVaultError, Result};

/// AES variant used by a vault.  Fixed at creation time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CipherStrength {
    #[default]
    Strong,
    Medium,
    Weak,
}

impl CipherStrength {
    /// Every strength, strongest first.  `Vault::open` tries them in this order.
    pub const ALL: [CipherStrength; 3] = [Self::Strong, Self::Medium, Self::Weak];

    /// Length in bytes of the derived key.
    pub fn key_len(self) -> usize {
        match self {
            Self::Strong => 32,
            Self::Medium => 24,
            Self::Weak => 16,
        }
    }

    /// Human-readable cipher name, e.g. "AES-256".
    pub fn cipher_name(self) -> &'static str {
        match self {
            Self::Strong => "AES-256",
            Self::Medium => "AES-192",
            Self::Weak => "AES-128",
        }
    }
}

impl fmt::Display for CipherStrength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Strong => "strong",
            Self::Medium => "medium",
            Self::Weak => "weak",
        };
        f.write_str(name)
    }
}

impl FromStr for CipherStrength {
    type Err = FileVaultError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "strong" | "aes-256" | "aes256" => Ok(Self::Strong),
            "medium" | "aes-192" | "aes192" => Ok(Self::Medium),
            "weak" | "aes-128" | "aes128" => Ok(Self::Weak),
            other => Err(FileVaultError::ConfigError(format!(
                "unknown cipher strength '{other}' (expected strong, medium or weak)"
            ))),
        }
    }
}

/// Key material for an open vault.  Lives only in memory and is zeroed on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct VaultKey {
    bytes: Vec<u8>,
    #[zeroize(skip)]
    strength: CipherStrength,
}

impl VaultKey {
    /// Derive the key for `strength` from a passphrase.
    pub fn derive(passphrase: &[u8], strength: CipherStrength) -> Self {
        let mut digest = Sha256::digest(passphrase);
        let bytes = digest[..strength.key_len()].to_vec();
        digest.as_mut_slice().zeroize();
        Self { bytes, strength }
    }

    /// Access the raw key bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn strength(&self) -> CipherStrength {
        self.strength
    }

    /// Wrap raw bytes without derivation.  Lets tests exercise bad key lengths.
    #[cfg(test)]
    pub(crate) fn from_raw(bytes: Vec<u8>, strength: CipherStrength) -> Self {
        Self { bytes, strength }
    }
}

impl fmt::Debug for VaultKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VaultKey")
            .field("strength", &self.strength)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_lengths_follow_strength() {
        for strength in CipherStrength::ALL {
            let key = VaultKey::derive(b"secret", strength);
            assert_eq!(key.as_bytes().len(), strength.key_len());
        }
    }

    #[test]
    fn weaker_keys_are_prefixes_of_the_digest() {
        let strong = VaultKey::derive(b"secret", CipherStrength::Strong);
        let weak = VaultKey::derive(b"secret", CipherStrength::Weak);
        assert_eq!(&strong.as_bytes()[..16], weak.as_bytes());
    }

    #[test]
    fn default_strength_is_strong() {
        assert_eq!(CipherStrength::default(), CipherStrength::Strong);
    }

    #[test]
    fn parses_strength_names() {
        assert_eq!("strong".parse::<CipherStrength>().unwrap(), CipherStrength::Strong);
        assert_eq!("AES-192".parse::<CipherStrength>().unwrap(), CipherStrength::Medium);
        assert_eq!("weak".parse::<CipherStrength>().unwrap(), CipherStrength::Weak);
        assert!("extreme".parse::<CipherStrength>().is_err());
    }

    #[test]
    fn debug_output_hides_key_bytes() {
        let key = VaultKey::derive(b"secret", CipherStrength::Strong);
        let shown = format!("{key:?}");
        assert!(shown.contains("Strong"));
        assert!(!shown.contains("bytes"));
    }
}
