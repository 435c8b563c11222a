//! Authentication tags over ciphertext: HMAC-SHA256 keyed with the vault key.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use super::kdf::VaultKey;
use crate::errors::{FileVaultError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Length of an authentication tag in bytes.
pub const TAG_LEN: usize = 32;

/// Running keyed hash fed one ciphertext block at a time.
pub struct TagAccumulator {
    mac: HmacSha256,
}

impl TagAccumulator {
    pub fn new(key: &VaultKey) -> Result<Self> {
        let bytes = key.as_bytes();
        let mac = HmacSha256::new_from_slice(bytes)
            .map_err(|_| FileVaultError::InvalidKeyLength(bytes.len()))?;
        Ok(Self { mac })
    }

    pub fn update(&mut self, ciphertext: &[u8]) {
        self.mac.update(ciphertext);
    }

    /// Produce the final tag.
    pub fn finalize(self) -> Vec<u8> {
        self.mac.finalize().into_bytes().to_vec()
    }

    /// Constant-time comparison against an expected tag.
    pub fn verify(self, expected: &[u8]) -> bool {
        self.mac.verify_slice(expected).is_ok()
    }
}
