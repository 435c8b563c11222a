//! Cryptographic primitives for FileVault.
//!
//! This module provides:
//! - SHA-256 passphrase-to-key derivation and `CipherStrength` (`kdf`)
//! - AES-CBC encryptor/decryptor factory (`cipher`)
//! - HMAC-SHA256 authentication tags over ciphertext (`tag`)
//! - Block-by-block file encryption and decryption (`file_codec`)

pub mod cipher;
pub mod file_codec;
pub mod kdf;
pub mod tag;

// Re-export the most commonly used items so callers can write:
//   use crate::crypto::{VaultKey, CipherStrength, FileCryptoCodec, ...};
pub use cipher::{BlockCipherEngine, CbcDecryptor, CbcEncryptor, BLOCK_SIZE};
pub use file_codec::{padding_for, FileCryptoCodec, FileSeal};
pub use kdf::{CipherStrength, VaultKey};
pub use tag::{TagAccumulator, TAG_LEN};
